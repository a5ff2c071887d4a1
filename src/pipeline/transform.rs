use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single column-level operation applied to tabular rows within a stage.
///
/// Transforms are declarative: the execution engine interprets them against
/// the stage's input rows. A stage declares an ordered sequence of these,
/// and the order is preserved exactly as declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    /// Rename columns according to the mapping (old name -> new name).
    RenameColumns { mapping: BTreeMap<String, String> },
    /// Copy an existing column to a new column.
    CopyColumn { src: String, dst: String },
    /// Add a new, empty column.
    AddColumn { name: String },
    /// Replace cell values in the given columns according to the mapping.
    ReplaceValues {
        columns: Vec<String>,
        mapping: BTreeMap<String, String>,
        case_sensitive: bool,
    },
    /// Parse the structured answer out of a raw model response column.
    ExtractAnswer { src: String, dst: String },
    /// Pull token usage statistics out of the inference metadata. The
    /// usage field layout differs per provider, so the provider travels
    /// with the transform.
    ExtractUsage { provider: String },
    /// Collapse repeated answers per id into the most frequent one,
    /// written to a `majority_vote` column.
    MajorityVote { id_column: String },
    /// Repeat every row `n_repeats` times, tagging each copy with a
    /// repeat id.
    Repeat { n_repeats: u32 },
}

impl Transform {
    pub fn rename(pairs: &[(&str, &str)]) -> Self {
        Self::RenameColumns {
            mapping: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Self::RenameColumns { .. } => "rename_columns",
            Self::CopyColumn { .. } => "copy_column",
            Self::AddColumn { .. } => "add_column",
            Self::ReplaceValues { .. } => "replace_values",
            Self::ExtractAnswer { .. } => "extract_answer",
            Self::ExtractUsage { .. } => "extract_usage",
            Self::MajorityVote { .. } => "majority_vote",
            Self::Repeat { .. } => "repeat",
        }
    }
}
