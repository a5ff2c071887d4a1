use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::ModelConfig;
use crate::pipeline::{
    AggregateFn, AggregatorConfig, DataProcessingConfig, DataSourceConfig, EvalReportingConfig,
    InferenceConfig, MetricConfig, PipelineDescription, PromptProcessingConfig, StageConfig,
    Transform, INFERENCE_RESULT_FILE, METRIC_RESULTS_FILE, TRANSFORMED_DATA_FILE,
};

/// Dataset of TSP instances with ground-truth tours.
pub const TSP_DATASET: &str = "microsoft/tsp";
pub const TSP_SPLIT: &str = "train";

/// Metric the engine scores each answer with. The per-row outcome lands in
/// `tsp_match_result` as `correct` / `incorrect` / `none`.
pub const TSP_METRIC: &str = "tsp_match";

const DATA_PROCESSING_DIR: &str = "data_processing";
const INFERENCE_DIR: &str = "inference_result";
const ANSWER_EXTRACTION_DIR: &str = "answer_extraction";
const EVAL_REPORT_DIR: &str = "eval_report";
const POSTEVAL_DIR: &str = "posteval_processing";
const BEST_OF_N_DIR: &str = "best_of_n_report";
const WORST_OF_N_DIR: &str = "worst_of_n_report";
const MAJORITY_VOTE_PROCESSING_DIR: &str = "majority_vote_processing";
const MAJORITY_VOTE_REPORT_DIR: &str = "majority_vote_report";

const REPEAT_ID_COL: &str = "data_repeat_id";
const POINT_ID_COL: &str = "data_point_id";
const CATEGORY_COL: &str = "category";
const USAGE_COMPLETION_COL: &str = "usage_completion";

/// Prompt template shipped with this crate, addressed relative to the
/// crate's own location.
pub fn default_template_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("prompt_templates")
        .join("tsp_o1.jinja")
}

/// Knobs for the TSP pipeline. `n_repeats` only takes effect through
/// [`TspMultiRunPipeline`].
#[derive(Debug, Clone)]
pub struct TspPipelineOptions {
    pub resume_from: Option<PathBuf>,
    pub n_repeats: u32,
}

impl Default for TspPipelineOptions {
    fn default() -> Self {
        Self {
            resume_from: None,
            n_repeats: 1,
        }
    }
}

/// The TSP benchmark pipeline: nine stages, each owning one directory under
/// a shared root.
///
/// Every stage configuration is retained as a public field so a variant can
/// adjust it between construction and [`into_description`](Self::into_description).
#[derive(Debug, Clone, PartialEq)]
pub struct TspPipeline {
    pub data_processing: PromptProcessingConfig,
    pub inference: InferenceConfig,
    pub answer_extraction: DataProcessingConfig,
    pub eval_reporting: EvalReportingConfig,
    pub posteval_processing: DataProcessingConfig,
    pub best_of_n_reporting: EvalReportingConfig,
    pub worst_of_n_reporting: EvalReportingConfig,
    pub majority_vote_processing: DataProcessingConfig,
    pub majority_vote_reporting: EvalReportingConfig,
    root_dir: PathBuf,
}

impl TspPipeline {
    /// Build the nine stage configurations in execution order. Pure
    /// construction: no filesystem or network access happens here.
    pub fn configure(
        model: ModelConfig,
        root_dir: impl Into<PathBuf>,
        options: &TspPipelineOptions,
    ) -> Self {
        let root = root_dir.into();
        let metric = MetricConfig::new(TSP_METRIC);
        let result_col = metric.result_column();
        let numeric_col = format!("{}_numeric", result_col);
        let provider = model.provider.clone();

        // 1. Load the dataset and render prompts.
        let data_processing = PromptProcessingConfig {
            data: DataSourceConfig::hugging_face(TSP_DATASET, TSP_SPLIT).with_transforms(vec![
                Transform::rename(&[("query_text", "prompt"), ("target_text", "ground_truth")]),
            ]),
            template_path: default_template_path(),
            output_dir: root.join(DATA_PROCESSING_DIR),
        };

        // 2. Run the model, one request at a time.
        let inference = InferenceConfig {
            model,
            input_path: data_processing.output_dir.join(TRANSFORMED_DATA_FILE),
            output_dir: root.join(INFERENCE_DIR),
            resume_from: options.resume_from.clone(),
            max_concurrent: 1,
        };

        // 3. Parse the raw response into a structured answer and pull out
        //    token usage.
        let answer_extraction = DataProcessingConfig {
            data: DataSourceConfig::jsonl(
                inference.output_dir.join(INFERENCE_RESULT_FILE),
            )
            .with_transforms(vec![
                Transform::rename(&[("model_output", "raw_output")]),
                Transform::AddColumn {
                    name: "model_output".to_string(),
                },
                Transform::ExtractAnswer {
                    src: "raw_output".to_string(),
                    dst: "model_output".to_string(),
                },
                Transform::ExtractUsage { provider },
            ]),
            output_dir: root.join(ANSWER_EXTRACTION_DIR),
        };

        // 4. Score the answers and report pass rates per repeat, across
        //    repeats, and average completion usage.
        let eval_reporting = EvalReportingConfig {
            data: DataSourceConfig::jsonl(
                answer_extraction.output_dir.join(TRANSFORMED_DATA_FILE),
            ),
            metric: Some(metric.clone()),
            aggregators: vec![
                // Each repeat scored on its own is an individual pass@1.
                AggregatorConfig::Count {
                    column_names: vec![result_col.clone()],
                    group_by: REPEAT_ID_COL.into(),
                    normalize: true,
                    filename_base: "tsp_match_separate_runs".to_string(),
                },
                AggregatorConfig::Count {
                    column_names: vec![result_col.clone()],
                    group_by: [REPEAT_ID_COL, CATEGORY_COL].into(),
                    normalize: true,
                    filename_base: "tsp_match_by_category_separate_runs".to_string(),
                },
                // Mean and spread of the N pass@1 scores.
                AggregatorConfig::BiLevelCount {
                    column_names: vec![result_col.clone()],
                    first_group_by: REPEAT_ID_COL.into(),
                    second_group_by: None,
                    normalize: true,
                    filename_base: "tsp_match_all_runs".to_string(),
                },
                AggregatorConfig::BiLevelCount {
                    column_names: vec![result_col.clone()],
                    first_group_by: [REPEAT_ID_COL, CATEGORY_COL].into(),
                    second_group_by: Some(CATEGORY_COL.into()),
                    normalize: true,
                    filename_base: "tsp_match_by_category_all_runs".to_string(),
                },
                AggregatorConfig::BiLevel {
                    column_names: vec![USAGE_COMPLETION_COL.to_string()],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: None,
                    agg_fn: AggregateFn::Mean,
                    filename_base: "usage_completion_all_runs".to_string(),
                },
                AggregatorConfig::BiLevel {
                    column_names: vec![USAGE_COMPLETION_COL.to_string()],
                    first_group_by: [POINT_ID_COL, CATEGORY_COL].into(),
                    second_group_by: Some(CATEGORY_COL.into()),
                    agg_fn: AggregateFn::Mean,
                    filename_base: "usage_completion_by_category_all_runs".to_string(),
                },
            ],
            output_dir: root.join(EVAL_REPORT_DIR),
        };

        // 5. Turn the categorical outcome into a numeric column so the
        //    best/worst-of-N reports can take max/min over it.
        let posteval_processing = DataProcessingConfig {
            data: DataSourceConfig::jsonl(
                eval_reporting.output_dir.join(METRIC_RESULTS_FILE),
            )
            .with_transforms(vec![
                Transform::CopyColumn {
                    src: result_col.clone(),
                    dst: numeric_col.clone(),
                },
                Transform::ReplaceValues {
                    columns: vec![numeric_col.clone()],
                    mapping: BTreeMap::from([
                        ("correct".to_string(), "1".to_string()),
                        ("incorrect".to_string(), "0".to_string()),
                        ("none".to_string(), "NaN".to_string()),
                    ]),
                    case_sensitive: false,
                },
            ]),
            output_dir: root.join(POSTEVAL_DIR),
        };

        let posteval_output = posteval_processing
            .output_dir
            .join(TRANSFORMED_DATA_FILE);

        // 6. Best of N per problem instance, plus total usage spent on it.
        let best_of_n_reporting = EvalReportingConfig {
            data: DataSourceConfig::jsonl(posteval_output.clone()),
            metric: None,
            aggregators: vec![
                AggregatorConfig::BiLevel {
                    column_names: vec![numeric_col.clone()],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: None,
                    agg_fn: AggregateFn::Max,
                    filename_base: "tsp_match_best_of_n".to_string(),
                },
                AggregatorConfig::BiLevel {
                    column_names: vec![numeric_col.clone()],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: Some(CATEGORY_COL.into()),
                    agg_fn: AggregateFn::Max,
                    filename_base: "tsp_match_best_of_n_by_category".to_string(),
                },
                AggregatorConfig::BiLevel {
                    column_names: vec![USAGE_COMPLETION_COL.to_string()],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: None,
                    agg_fn: AggregateFn::Sum,
                    filename_base: "usage_completion_best_of_n".to_string(),
                },
            ],
            output_dir: root.join(BEST_OF_N_DIR),
        };

        // 7. Worst of N per problem instance.
        let worst_of_n_reporting = EvalReportingConfig {
            data: DataSourceConfig::jsonl(posteval_output),
            metric: None,
            aggregators: vec![
                AggregatorConfig::BiLevel {
                    column_names: vec![numeric_col.clone()],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: None,
                    agg_fn: AggregateFn::Min,
                    filename_base: "tsp_match_worst_of_n".to_string(),
                },
                AggregatorConfig::BiLevel {
                    column_names: vec![numeric_col],
                    first_group_by: POINT_ID_COL.into(),
                    second_group_by: Some(CATEGORY_COL.into()),
                    agg_fn: AggregateFn::Min,
                    filename_base: "tsp_match_worst_of_n_by_category".to_string(),
                },
            ],
            output_dir: root.join(WORST_OF_N_DIR),
        };

        // 8. Collapse the repeated answers into a majority answer. Reads
        //    the extraction output again, not the eval report.
        let majority_vote_processing = DataProcessingConfig {
            data: DataSourceConfig::jsonl(
                answer_extraction.output_dir.join(TRANSFORMED_DATA_FILE),
            )
            .with_transforms(vec![
                Transform::MajorityVote {
                    id_column: POINT_ID_COL.to_string(),
                },
                Transform::rename(&[
                    ("model_output", "model_output_onerun"),
                    ("majority_vote", "model_output"),
                ]),
            ]),
            output_dir: root.join(MAJORITY_VOTE_PROCESSING_DIR),
        };

        // 9. Score the majority answer.
        let majority_vote_reporting = EvalReportingConfig {
            data: DataSourceConfig::jsonl(
                majority_vote_processing
                    .output_dir
                    .join(TRANSFORMED_DATA_FILE),
            ),
            metric: Some(metric),
            aggregators: vec![AggregatorConfig::BiLevelCount {
                column_names: vec![result_col],
                first_group_by: POINT_ID_COL.into(),
                second_group_by: None,
                normalize: true,
                filename_base: "majority_vote".to_string(),
            }],
            output_dir: root.join(MAJORITY_VOTE_REPORT_DIR),
        };

        Self {
            data_processing,
            inference,
            answer_extraction,
            eval_reporting,
            posteval_processing,
            best_of_n_reporting,
            worst_of_n_reporting,
            majority_vote_processing,
            majority_vote_reporting,
            root_dir: root,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Finalize into the ordered description the execution engine consumes.
    pub fn into_description(self) -> PipelineDescription {
        let root = self.root_dir;
        PipelineDescription::new(
            vec![
                StageConfig::PromptProcessing(self.data_processing),
                StageConfig::Inference(self.inference),
                StageConfig::DataProcessing(self.answer_extraction),
                StageConfig::EvalReporting(self.eval_reporting),
                StageConfig::DataProcessing(self.posteval_processing),
                StageConfig::EvalReporting(self.best_of_n_reporting),
                StageConfig::EvalReporting(self.worst_of_n_reporting),
                StageConfig::DataProcessing(self.majority_vote_processing),
                StageConfig::EvalReporting(self.majority_vote_reporting),
            ],
            root,
        )
    }
}

/// Variant that benchmarks each TSP instance `n_repeats` times: the base
/// pipeline with one extra repeat transform appended to the first stage.
pub struct TspMultiRunPipeline;

impl TspMultiRunPipeline {
    pub fn configure(
        model: ModelConfig,
        root_dir: impl Into<PathBuf>,
        options: &TspPipelineOptions,
    ) -> TspPipeline {
        let mut pipeline = TspPipeline::configure(model, root_dir, options);
        pipeline.data_processing.data.transforms.push(Transform::Repeat {
            n_repeats: options.n_repeats,
        });
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DataSource;

    fn model() -> ModelConfig {
        ModelConfig::new("o1-preview", "azure_openai")
    }

    fn configure() -> TspPipeline {
        TspPipeline::configure(model(), "/logs/tsp_run", &TspPipelineOptions::default())
    }

    #[test]
    fn test_nine_stages_in_fixed_order() {
        let description = configure().into_description();
        assert_eq!(description.stage_count(), 9);
        assert_eq!(description.root_dir, PathBuf::from("/logs/tsp_run"));

        let kinds: Vec<&str> = description.stages.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "prompt_processing",
                "inference",
                "data_processing",
                "eval_reporting",
                "data_processing",
                "eval_reporting",
                "eval_reporting",
                "data_processing",
                "eval_reporting",
            ]
        );
    }

    #[test]
    fn test_output_dirs_unique_one_level_under_root() {
        let description = configure().into_description();
        let mut dirs = std::collections::HashSet::new();
        for stage in &description.stages {
            assert_eq!(
                stage.output_dir().parent(),
                Some(description.root_dir.as_path())
            );
            assert!(dirs.insert(stage.output_dir().to_path_buf()));
        }
        description.validate().expect("tsp pipeline should validate");
    }

    #[test]
    fn test_configure_twice_is_independent() {
        let first = configure();
        let mut second = configure();
        assert_eq!(first, second);

        second
            .data_processing
            .data
            .transforms
            .push(Transform::Repeat { n_repeats: 3 });
        assert_ne!(first, second);
        assert_eq!(first.data_processing.data.transforms.len(), 1);
    }

    #[test]
    fn test_multi_run_appends_single_repeat() {
        let base = configure();
        let multi =
            TspMultiRunPipeline::configure(model(), "/logs/tsp_run", &TspPipelineOptions::default());

        let base_seq = &base.data_processing.data.transforms;
        let multi_seq = &multi.data_processing.data.transforms;
        assert_eq!(multi_seq.len(), base_seq.len() + 1);
        assert_eq!(&multi_seq[..base_seq.len()], base_seq.as_slice());
        assert_eq!(multi_seq.last(), Some(&Transform::Repeat { n_repeats: 1 }));

        // Only the first stage differs from the base pipeline.
        assert_eq!(base.inference, multi.inference);
        assert_eq!(base.eval_reporting, multi.eval_reporting);
    }

    #[test]
    fn test_multi_run_respects_repeat_option() {
        let options = TspPipelineOptions {
            resume_from: None,
            n_repeats: 5,
        };
        let multi = TspMultiRunPipeline::configure(model(), "/logs/tsp_run", &options);
        assert_eq!(
            multi.data_processing.data.transforms.last(),
            Some(&Transform::Repeat { n_repeats: 5 })
        );
        multi
            .into_description()
            .validate()
            .expect("multi-run pipeline should validate");
    }

    #[test]
    fn test_dataset_reference_and_rename() {
        let pipeline = configure();
        assert_eq!(
            pipeline.data_processing.data.source,
            DataSource::HuggingFace {
                dataset_id: "microsoft/tsp".to_string(),
                split: "train".to_string(),
            }
        );
        match &pipeline.data_processing.data.transforms[0] {
            Transform::RenameColumns { mapping } => {
                assert_eq!(mapping["query_text"], "prompt");
                assert_eq!(mapping["target_text"], "ground_truth");
            }
            other => panic!("expected rename, got {:?}", other),
        }
        assert!(pipeline.data_processing.template_path.ends_with("prompt_templates/tsp_o1.jinja"));
    }

    #[test]
    fn test_inference_single_slot_and_wiring() {
        let pipeline = configure();
        assert_eq!(pipeline.inference.max_concurrent, 1);
        assert!(pipeline.inference.resume_from.is_none());
        assert_eq!(
            pipeline.inference.input_path,
            PathBuf::from("/logs/tsp_run/data_processing/transformed_data.jsonl")
        );
        assert_eq!(pipeline.inference.model.name, "o1-preview");
    }

    #[test]
    fn test_resume_checkpoint_passes_through() {
        let options = TspPipelineOptions {
            resume_from: Some(PathBuf::from("/logs/previous/inference_result.jsonl")),
            n_repeats: 1,
        };
        let pipeline = TspPipeline::configure(model(), "/logs/tsp_run", &options);
        assert_eq!(
            pipeline.inference.resume_from,
            Some(PathBuf::from("/logs/previous/inference_result.jsonl"))
        );
    }

    #[test]
    fn test_posteval_maps_outcomes_to_numeric() {
        let pipeline = configure();
        let transforms = &pipeline.posteval_processing.data.transforms;
        assert_eq!(transforms.len(), 2);

        match &transforms[0] {
            Transform::CopyColumn { src, dst } => {
                assert_eq!(src, "tsp_match_result");
                assert_eq!(dst, "tsp_match_result_numeric");
            }
            other => panic!("expected copy, got {:?}", other),
        }
        match &transforms[1] {
            Transform::ReplaceValues {
                columns,
                mapping,
                case_sensitive,
            } => {
                assert_eq!(columns, &["tsp_match_result_numeric".to_string()]);
                assert_eq!(mapping["correct"], "1");
                assert_eq!(mapping["incorrect"], "0");
                assert_eq!(mapping["none"], "NaN");
                assert!(!case_sensitive);
            }
            other => panic!("expected replace, got {:?}", other),
        }
    }

    #[test]
    fn test_best_and_worst_of_n_aggregation() {
        let pipeline = configure();

        let best = &pipeline.best_of_n_reporting.aggregators;
        assert_eq!(best.len(), 3);
        match &best[0] {
            AggregatorConfig::BiLevel { agg_fn, .. } => assert_eq!(*agg_fn, AggregateFn::Max),
            other => panic!("expected bi-level, got {:?}", other),
        }
        match &best[2] {
            AggregatorConfig::BiLevel {
                column_names,
                agg_fn,
                ..
            } => {
                assert_eq!(column_names, &["usage_completion".to_string()]);
                assert_eq!(*agg_fn, AggregateFn::Sum);
            }
            other => panic!("expected bi-level, got {:?}", other),
        }

        let worst = &pipeline.worst_of_n_reporting.aggregators;
        assert_eq!(worst.len(), 2);
        for agg in worst {
            match agg {
                AggregatorConfig::BiLevel { agg_fn, .. } => assert_eq!(*agg_fn, AggregateFn::Min),
                other => panic!("expected bi-level, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_majority_vote_rereads_extraction_output() {
        let pipeline = configure();
        assert_eq!(
            pipeline.majority_vote_processing.data.input_path(),
            Some(Path::new(
                "/logs/tsp_run/answer_extraction/transformed_data.jsonl"
            ))
        );
        match &pipeline.majority_vote_processing.data.transforms[0] {
            Transform::MajorityVote { id_column } => assert_eq!(id_column, "data_point_id"),
            other => panic!("expected majority vote, got {:?}", other),
        }

        let mv = &pipeline.majority_vote_reporting;
        assert_eq!(mv.metric.as_ref().map(|m| m.name.as_str()), Some("tsp_match"));
        assert_eq!(mv.aggregators.len(), 1);
        assert_eq!(mv.aggregators[0].filename_base(), "majority_vote");
    }

    #[test]
    fn test_eval_report_aggregator_set() {
        let pipeline = configure();
        let bases: Vec<&str> = pipeline
            .eval_reporting
            .aggregators
            .iter()
            .map(|a| a.filename_base())
            .collect();
        assert_eq!(
            bases,
            vec![
                "tsp_match_separate_runs",
                "tsp_match_by_category_separate_runs",
                "tsp_match_all_runs",
                "tsp_match_by_category_all_runs",
                "usage_completion_all_runs",
                "usage_completion_by_category_all_runs",
            ]
        );
        assert_eq!(
            pipeline.eval_reporting.metric.as_ref().map(|m| m.name.as_str()),
            Some("tsp_match")
        );
    }
}
