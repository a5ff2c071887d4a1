//! Declarative pipeline definitions for benchmarking language models on
//! Traveling Salesman problems.
//!
//! This crate assembles stage, transform, and aggregator configuration into
//! a [`pipeline::PipelineDescription`] that an external execution engine
//! runs. Nothing here performs inference, scoring, or aggregation; building
//! a description is pure construction with no filesystem or network access.

pub mod benchmark;
pub mod config;
pub mod model;
pub mod pipeline;

pub use benchmark::{TspMultiRunPipeline, TspPipeline, TspPipelineOptions};
pub use model::ModelConfig;
pub use pipeline::PipelineDescription;
