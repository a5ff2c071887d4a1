pub mod tsp;

pub use tsp::{TspMultiRunPipeline, TspPipeline, TspPipelineOptions};
