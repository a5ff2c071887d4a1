use serde::{Deserialize, Serialize};

/// Grouping key(s) for an aggregation. Serializes as a bare string for a
/// single key and as an array for a compound key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupBy {
    Single(String),
    Multi(Vec<String>),
}

impl GroupBy {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Single(key) => vec![key.as_str()],
            Self::Multi(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for GroupBy {
    fn from(key: &str) -> Self {
        Self::Single(key.to_string())
    }
}

impl From<[&str; 2]> for GroupBy {
    fn from(keys: [&str; 2]) -> Self {
        Self::Multi(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Aggregation function for numeric bi-level aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Mean,
    Max,
    Min,
    Sum,
}

/// Configuration for summarizing metric columns across grouped rows.
///
/// `Count` tallies categorical values per group. The bi-level variants
/// aggregate within `first_group_by` groups and then summarize across
/// them (optionally re-grouped by `second_group_by`), which is how
/// best-of-N / worst-of-N and across-repeat statistics are expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregatorConfig {
    Count {
        column_names: Vec<String>,
        group_by: GroupBy,
        #[serde(default)]
        normalize: bool,
        filename_base: String,
    },
    BiLevelCount {
        column_names: Vec<String>,
        first_group_by: GroupBy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second_group_by: Option<GroupBy>,
        #[serde(default)]
        normalize: bool,
        filename_base: String,
    },
    BiLevel {
        column_names: Vec<String>,
        first_group_by: GroupBy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second_group_by: Option<GroupBy>,
        agg_fn: AggregateFn,
        filename_base: String,
    },
}

impl AggregatorConfig {
    pub fn filename_base(&self) -> &str {
        match self {
            Self::Count { filename_base, .. }
            | Self::BiLevelCount { filename_base, .. }
            | Self::BiLevel { filename_base, .. } => filename_base,
        }
    }

    pub fn column_names(&self) -> &[String] {
        match self {
            Self::Count { column_names, .. }
            | Self::BiLevelCount { column_names, .. }
            | Self::BiLevel { column_names, .. } => column_names,
        }
    }
}
