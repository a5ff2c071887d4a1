use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::StageConfig;

/// Errors surfaced by [`PipelineDescription::validate`].
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("pipeline has no stages")]
    Empty,

    #[error("duplicate output directory: {}", .0.display())]
    DuplicateOutputDir(PathBuf),

    #[error("output directory {} is not directly under root {}", .dir.display(), .root.display())]
    OutsideRoot { dir: PathBuf, root: PathBuf },

    #[error("stage {index} ({kind}) reads {}, which no earlier stage produces", .path.display())]
    DanglingInput {
        index: usize,
        kind: &'static str,
        path: PathBuf,
    },
}

/// An ordered list of stage configurations plus the shared root directory
/// each stage nests its output directory under.
///
/// Construction is side-effect-free: nothing is created on disk and nothing
/// is checked until [`validate`](Self::validate) is called, so configuration
/// errors surface at pipeline execution time, not definition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescription {
    pub stages: Vec<StageConfig>,
    pub root_dir: PathBuf,
}

impl PipelineDescription {
    pub fn new(stages: Vec<StageConfig>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            stages,
            root_dir: root_dir.into(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Check the structural invariants of the description: at least one
    /// stage; every output directory unique and exactly one level under the
    /// shared root; every declared input produced by an earlier stage (the
    /// stages form a linear hand-off chain over the filesystem).
    pub fn validate(&self) -> Result<(), DescriptionError> {
        if self.stages.is_empty() {
            return Err(DescriptionError::Empty);
        }

        let mut seen_dirs = HashSet::new();
        let mut produced = HashSet::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let dir = stage.output_dir().to_path_buf();
            if dir.parent() != Some(self.root_dir.as_path()) {
                return Err(DescriptionError::OutsideRoot {
                    dir,
                    root: self.root_dir.clone(),
                });
            }
            if !seen_dirs.insert(dir.clone()) {
                return Err(DescriptionError::DuplicateOutputDir(dir));
            }

            if let Some(input) = stage.input_path() {
                if !produced.contains(input) {
                    return Err(DescriptionError::DanglingInput {
                        index,
                        kind: stage.kind(),
                        path: input.to_path_buf(),
                    });
                }
            }

            produced.insert(stage.output_file());
        }

        Ok(())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
