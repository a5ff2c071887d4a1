pub mod aggregator;
pub mod description;
pub mod stage;
pub mod transform;

pub use aggregator::{AggregateFn, AggregatorConfig, GroupBy};
pub use description::{DescriptionError, PipelineDescription};
pub use stage::{
    DataProcessingConfig, DataSource, DataSourceConfig, EvalReportingConfig, InferenceConfig,
    MetricConfig, PromptProcessingConfig, StageConfig, INFERENCE_RESULT_FILE, METRIC_RESULTS_FILE,
    TRANSFORMED_DATA_FILE,
};
pub use transform::Transform;
