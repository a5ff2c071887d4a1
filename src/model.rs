use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Caller-supplied description of the model under benchmark. The pipeline
/// treats it as opaque configuration: it is embedded in the inference stage
/// and handed to the execution engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Free-form generation parameters (temperature, max tokens, ...).
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            endpoint: None,
            params: serde_json::Value::Null,
        }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse model config {}", path.display()))
    }
}
