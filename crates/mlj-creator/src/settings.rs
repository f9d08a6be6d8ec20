//! Creator settings
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! filter_runtime_mappings_on_save = true
//! exclude_frozen_data = true
//! refresh_interval_ms = 100
//! shared_results_index_name = "shared"
//! datafeed_id_prefix = "datafeed-"
//! ```

use std::path::Path;
use std::time::Duration;

use mlj_config::{DATAFEED_ID_PREFIX, SHARED_RESULTS_INDEX_NAME};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Tunables of the job creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatorSettings {
    /// Drop runtime mappings the job does not use before saving the datafeed
    pub filter_runtime_mappings_on_save: bool,
    /// Exclude frozen-tier data when discovering the time range
    pub exclude_frozen_data: bool,
    /// Progress poll interval
    pub refresh_interval_ms: u64,
    /// Results index shared by jobs without a dedicated one
    pub shared_results_index_name: String,
    /// Prefix of generated datafeed ids
    pub datafeed_id_prefix: String,
}

impl Default for CreatorSettings {
    fn default() -> Self {
        Self {
            filter_runtime_mappings_on_save: true,
            exclude_frozen_data: true,
            refresh_interval_ms: 100,
            shared_results_index_name: SHARED_RESULTS_INDEX_NAME.to_string(),
            datafeed_id_prefix: DATAFEED_ID_PREFIX.to_string(),
        }
    }
}

impl CreatorSettings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns error on invalid TOML or mistyped keys
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!("loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Poll interval for lookback progress
    #[inline]
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Datafeed id for a job id
    #[inline]
    #[must_use]
    pub fn datafeed_id(&self, job_id: &str) -> String {
        format!("{}{job_id}", self.datafeed_id_prefix)
    }

    /// Whether `name` is a dedicated results index
    #[inline]
    #[must_use]
    pub fn is_dedicated_index(&self, name: &str) -> bool {
        name != self.shared_results_index_name
    }

    /// With filter flag
    #[inline]
    #[must_use]
    pub fn with_filter_runtime_mappings_on_save(mut self, enabled: bool) -> Self {
        self.filter_runtime_mappings_on_save = enabled;
        self
    }

    /// With frozen-tier exclusion default
    #[inline]
    #[must_use]
    pub fn with_exclude_frozen_data(mut self, enabled: bool) -> Self {
        self.exclude_frozen_data = enabled;
        self
    }

    /// With refresh interval
    #[inline]
    #[must_use]
    pub fn with_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let s = CreatorSettings::default();
        assert!(s.filter_runtime_mappings_on_save);
        assert!(s.exclude_frozen_data);
        assert_eq!(s.refresh_interval(), Duration::from_millis(100));
        assert_eq!(s.datafeed_id("cpu"), "datafeed-cpu");
        assert!(!s.is_dedicated_index("shared"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = CreatorSettings::from_toml_str("refresh_interval_ms = 250\n").unwrap();
        assert_eq!(s.refresh_interval_ms, 250);
        assert!(s.filter_runtime_mappings_on_save);
    }

    #[test]
    fn mistyped_key_is_rejected() {
        assert!(CreatorSettings::from_toml_str("refresh_interval_ms = \"fast\"\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datafeed_id_prefix = \"df-\"").unwrap();
        writeln!(file, "exclude_frozen_data = false").unwrap();
        let s = CreatorSettings::load(file.path()).unwrap();
        assert_eq!(s.datafeed_id("cpu"), "df-cpu");
        assert!(!s.exclude_frozen_data);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CreatorSettings::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
