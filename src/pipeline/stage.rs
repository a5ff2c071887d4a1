use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::aggregator::AggregatorConfig;
use super::transform::Transform;
use crate::model::ModelConfig;

/// Canonical file a data-processing or prompt-processing stage writes into
/// its output directory. Downstream tooling depends on these names.
pub const TRANSFORMED_DATA_FILE: &str = "transformed_data.jsonl";
/// Canonical file the inference stage writes into its output directory.
pub const INFERENCE_RESULT_FILE: &str = "inference_result.jsonl";
/// Canonical per-row metric file an eval-reporting stage writes.
pub const METRIC_RESULTS_FILE: &str = "metric_results.jsonl";

/// Where a stage reads its rows from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    /// A hosted dataset referenced by id and split; resolved by the
    /// execution engine, never fetched here.
    HuggingFace { dataset_id: String, split: String },
    /// A JSONL file produced by an earlier stage.
    Jsonl { path: PathBuf },
}

/// A data source plus the ordered transform sequence applied to its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub source: DataSource,
    #[serde(default)]
    pub transforms: Vec<Transform>,
}

impl DataSourceConfig {
    pub fn hugging_face(dataset_id: impl Into<String>, split: impl Into<String>) -> Self {
        Self {
            source: DataSource::HuggingFace {
                dataset_id: dataset_id.into(),
                split: split.into(),
            },
            transforms: Vec::new(),
        }
    }

    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self {
            source: DataSource::Jsonl { path: path.into() },
            transforms: Vec::new(),
        }
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn input_path(&self) -> Option<&Path> {
        match &self.source {
            DataSource::HuggingFace { .. } => None,
            DataSource::Jsonl { path } => Some(path),
        }
    }
}

/// Names the metric the execution engine scores each row with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
}

impl MetricConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Column the engine writes the per-row metric outcome to.
    pub fn result_column(&self) -> String {
        format!("{}_result", self.name)
    }
}

/// Load a dataset, transform it, and render a prompt template over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptProcessingConfig {
    pub data: DataSourceConfig,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Run the model over the transformed dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub model: ModelConfig,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Partial prior run to resume from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_from: Option<PathBuf>,
    /// Upper bound on concurrent requests the engine may issue.
    pub max_concurrent: usize,
}

/// Read rows from an earlier stage and apply a transform sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProcessingConfig {
    pub data: DataSourceConfig,
    pub output_dir: PathBuf,
}

/// Score rows and aggregate the results into reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReportingConfig {
    pub data: DataSourceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricConfig>,
    pub aggregators: Vec<AggregatorConfig>,
    pub output_dir: PathBuf,
}

/// One unit of the pipeline, tagged by stage kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    PromptProcessing(PromptProcessingConfig),
    Inference(InferenceConfig),
    DataProcessing(DataProcessingConfig),
    EvalReporting(EvalReportingConfig),
}

impl StageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PromptProcessing(_) => "prompt_processing",
            Self::Inference(_) => "inference",
            Self::DataProcessing(_) => "data_processing",
            Self::EvalReporting(_) => "eval_reporting",
        }
    }

    pub fn output_dir(&self) -> &Path {
        match self {
            Self::PromptProcessing(c) => &c.output_dir,
            Self::Inference(c) => &c.output_dir,
            Self::DataProcessing(c) => &c.output_dir,
            Self::EvalReporting(c) => &c.output_dir,
        }
    }

    /// The file this stage reads, when it consumes an earlier stage's
    /// output rather than an external dataset.
    pub fn input_path(&self) -> Option<&Path> {
        match self {
            Self::PromptProcessing(c) => c.data.input_path(),
            Self::Inference(c) => Some(&c.input_path),
            Self::DataProcessing(c) => c.data.input_path(),
            Self::EvalReporting(c) => c.data.input_path(),
        }
    }

    /// The file this stage contributes to the inter-stage hand-off chain.
    pub fn output_file(&self) -> PathBuf {
        let name = match self {
            Self::PromptProcessing(_) | Self::DataProcessing(_) => TRANSFORMED_DATA_FILE,
            Self::Inference(_) => INFERENCE_RESULT_FILE,
            Self::EvalReporting(_) => METRIC_RESULTS_FILE,
        };
        self.output_dir().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hugging_face_source_has_no_input_path() {
        let data = DataSourceConfig::hugging_face("microsoft/tsp", "train");
        assert!(data.input_path().is_none());
        assert!(data.transforms.is_empty());
    }

    #[test]
    fn test_jsonl_source_input_path() {
        let data = DataSourceConfig::jsonl("/logs/run/data_processing/transformed_data.jsonl");
        assert_eq!(
            data.input_path(),
            Some(Path::new("/logs/run/data_processing/transformed_data.jsonl"))
        );
    }

    #[test]
    fn test_stage_kind_and_output_file() {
        let stage = StageConfig::DataProcessing(DataProcessingConfig {
            data: DataSourceConfig::jsonl("/logs/run/inference_result/inference_result.jsonl"),
            output_dir: PathBuf::from("/logs/run/answer_extraction"),
        });
        assert_eq!(stage.kind(), "data_processing");
        assert_eq!(
            stage.output_file(),
            PathBuf::from("/logs/run/answer_extraction/transformed_data.jsonl")
        );
    }

    #[test]
    fn test_stage_serializes_with_stage_tag() {
        let stage = StageConfig::EvalReporting(EvalReportingConfig {
            data: DataSourceConfig::jsonl("/logs/run/answer_extraction/transformed_data.jsonl"),
            metric: Some(MetricConfig::new("tsp_match")),
            aggregators: vec![],
            output_dir: PathBuf::from("/logs/run/eval_report"),
        });
        let json = serde_json::to_string(&stage).expect("should serialize");
        assert!(json.contains("\"stage\":\"eval_reporting\""));
        let back: StageConfig = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, stage);
    }

    #[test]
    fn test_metric_result_column() {
        let metric = MetricConfig::new("tsp_match");
        assert_eq!(metric.result_column(), "tsp_match_result");
    }

    #[test]
    fn test_inference_resume_from_omitted_when_absent() {
        let stage = StageConfig::Inference(InferenceConfig {
            model: ModelConfig::new("gpt-4o", "openai"),
            input_path: PathBuf::from("/logs/run/data_processing/transformed_data.jsonl"),
            output_dir: PathBuf::from("/logs/run/inference_result"),
            resume_from: None,
            max_concurrent: 1,
        });
        let json = serde_json::to_string(&stage).expect("should serialize");
        assert!(!json.contains("resume_from"));
    }
}
