use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::builder::DEFAULT_DATASET_NAME;

// ---------------------------------------------------------------------------
// Facade settings
// ---------------------------------------------------------------------------

/// What to do with a recognised option whose value is out of its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionPolicy {
    /// Fail with `OptionError::OutOfDomain`.
    #[default]
    Strict,
    /// Drop the option with a warning and let the engine use its default.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Dataset name used when options carry no `datasetName`.
    pub default_dataset_name: String,
    pub option_policy: OptionPolicy,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            default_dataset_name: DEFAULT_DATASET_NAME.to_string(),
            option_policy: OptionPolicy::Strict,
        }
    }
}

impl FacadeConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing facade config")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg = FacadeConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, FacadeConfig::default());
        assert_eq!(cfg.default_dataset_name, "dataset");
    }

    #[test]
    fn lenient_policy_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"default_dataset_name": "iris", "option_policy": "lenient"}}"#
        )
        .unwrap();

        let cfg = FacadeConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.default_dataset_name, "iris");
        assert_eq!(cfg.option_policy, OptionPolicy::Lenient);
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let err = FacadeConfig::from_json_str(r#"{"option_policy": "loose"}"#).unwrap_err();
        assert!(err.to_string().contains("facade config"));
    }
}
