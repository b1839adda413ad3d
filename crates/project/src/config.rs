use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tgi_model::BitWidths;

pub const CONFIG_FILE_NAME: &str = "tgi.config.json";
pub const CONFIG_ENV_VAR: &str = "TGI_CONFIG";

const DEFAULT_PACKAGES_FOLDER: &str = "Packages";
const DEFAULT_LOOSE_FILES_FOLDER: &str = "Loose Files";
const DEFAULT_UNSUPPORTED_FOLDER: &str = "Unsupported";
const DEFAULT_FALLBACK_TUNING_NAME: &str = "UnnamedTuning";

/// Project configuration as written on disk. Every field is optional;
/// [`ProjectConfig::apply_defaults`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loose_files_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsupported_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_tuning_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_tables_as_json: Option<bool>,
    /// Tuning class name → instance id width.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub bit_widths: HashMap<String, u32>,
}

/// Configuration with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub packages_folder: String,
    pub loose_files_folder: String,
    pub unsupported_folder: String,
    pub fallback_tuning_name: String,
    pub string_tables_as_json: bool,
    pub bit_widths: BitWidths,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ProjectConfig::default().apply_defaults()
    }
}

impl ProjectConfig {
    /// Read a config file. A missing file yields the empty config.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|err| ProjectError::config(path, err.to_string()))?;
        config.validate(path)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub fn apply_defaults(self) -> ResolvedConfig {
        ResolvedConfig {
            packages_folder: non_empty_or(self.packages_folder, DEFAULT_PACKAGES_FOLDER),
            loose_files_folder: non_empty_or(self.loose_files_folder, DEFAULT_LOOSE_FILES_FOLDER),
            unsupported_folder: non_empty_or(self.unsupported_folder, DEFAULT_UNSUPPORTED_FOLDER),
            fallback_tuning_name: non_empty_or(
                self.fallback_tuning_name,
                DEFAULT_FALLBACK_TUNING_NAME,
            ),
            string_tables_as_json: self.string_tables_as_json.unwrap_or(true),
            bit_widths: BitWidths::with_overrides(self.bit_widths),
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some((class, width)) = self
            .bit_widths
            .iter()
            .find(|(_, width)| !(1..=64).contains(*width))
        {
            return Err(ProjectError::config(
                path,
                format!("bit width for {class} must be between 1 and 64, got {width}"),
            ));
        }
        Ok(())
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
