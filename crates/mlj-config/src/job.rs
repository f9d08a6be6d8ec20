//! Anomaly-detection job configuration
//!
//! Wire types for the job definition submitted to the analysis engine.
//! Optional settings are `Option`s that are skipped when unset; parent
//! objects that become empty are normalised back to `None` by their owners.
//! Keys this crate does not model are kept in `extra` so a definition edited
//! by hand survives a load/save round trip.

use std::borrow::Cow;
use std::fmt;

use mlj_catalog::AggregationId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigError;

/// Job identifier
pub type JobId = String;

/// Results index shared by jobs without a dedicated index
pub const SHARED_RESULTS_INDEX_NAME: &str = "shared";

/// Full anomaly-detection job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    pub analysis_config: AnalysisConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_limits: Option<AnalysisLimits>,
    #[serde(default)]
    pub data_description: DataDescription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_plot_config: Option<ModelPlotConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_index_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_settings: Option<CustomSettings>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl JobConfig {
    /// A blank job: no id, no detectors, no influencers
    #[must_use]
    pub fn empty() -> Self {
        Self {
            job_id: String::new(),
            description: Some(String::new()),
            groups: Some(Vec::new()),
            analysis_config: AnalysisConfig::default(),
            analysis_limits: None,
            data_description: DataDescription::default(),
            model_plot_config: None,
            results_index_name: None,
            custom_settings: None,
            extra: Map::new(),
        }
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error if the JSON is not a job definition
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is not a job definition
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_pretty_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Whether results go to a dedicated (non-shared) index
    #[inline]
    #[must_use]
    pub fn has_dedicated_results_index(&self) -> bool {
        self.results_index_name
            .as_deref()
            .is_some_and(|name| name != SHARED_RESULTS_INDEX_NAME)
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::empty()
    }
}

/// Analysis settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub bucket_span: String,
    #[serde(default)]
    pub detectors: Vec<Detector>,
    #[serde(default)]
    pub influencers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_count_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorization_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorization_filters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_partition_categorization: Option<PerPartitionCategorization>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Per-partition categorization flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerPartitionCategorization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_warn: Option<bool>,
}

/// Resource limits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_memory_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorization_examples_limit: Option<u64>,
}

impl AnalysisLimits {
    /// True when no limit is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.model_memory_limit.is_none() && self.categorization_examples_limit.is_none()
    }
}

/// Input data description
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataDescription {
    #[serde(default)]
    pub time_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

/// Model plot settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelPlotConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

/// Label recording which tool created a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatedBy(Cow<'static, str>);

impl CreatedBy {
    pub const SINGLE_METRIC: CreatedBy = CreatedBy(Cow::Borrowed("single-metric-wizard"));
    pub const MULTI_METRIC: CreatedBy = CreatedBy(Cow::Borrowed("multi-metric-wizard"));
    pub const POPULATION: CreatedBy = CreatedBy(Cow::Borrowed("population-wizard"));
    pub const CATEGORIZATION: CreatedBy = CreatedBy(Cow::Borrowed("categorization-wizard"));
    pub const RARE: CreatedBy = CreatedBy(Cow::Borrowed("rare-wizard"));
    pub const GEO: CreatedBy = CreatedBy(Cow::Borrowed("geo-wizard"));
    pub const ADVANCED: CreatedBy = CreatedBy(Cow::Borrowed("advanced-wizard"));

    /// Custom label
    #[inline]
    #[must_use]
    pub fn custom(label: impl Into<String>) -> Self {
        Self(Cow::Owned(label.into()))
    }

    /// Label text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drill-down link attached to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomUrl {
    pub url_name: String,
    pub url_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CustomUrl {
    #[must_use]
    pub fn new(url_name: impl Into<String>, url_value: impl Into<String>) -> Self {
        Self {
            url_name: url_name.into(),
            url_value: url_value.into(),
            time_range: None,
            extra: Map::new(),
        }
    }
}

/// Free-form job settings owned by the UI
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<CreatedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_urls: Option<Vec<CustomUrl>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CustomSettings {
    /// True when nothing is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created_by.is_none() && self.custom_urls.is_none() && self.extra.is_empty()
    }
}

/// One detector of the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    pub function: AggregationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_frequent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<Vec<JsonValue>>,
}

impl Detector {
    /// Detector with only a function
    #[inline]
    #[must_use]
    pub fn new(function: AggregationId) -> Self {
        Self {
            function,
            field_name: None,
            by_field_name: None,
            over_field_name: None,
            partition_field_name: None,
            exclude_frequent: None,
            detector_description: None,
            use_null: None,
            custom_rules: None,
        }
    }

    /// With analysed field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field_name = Some(field.into());
        self
    }

    /// With by field
    #[inline]
    #[must_use]
    pub fn with_by_field(mut self, field: impl Into<String>) -> Self {
        self.by_field_name = Some(field.into());
        self
    }

    /// With over field
    #[inline]
    #[must_use]
    pub fn with_over_field(mut self, field: impl Into<String>) -> Self {
        self.over_field_name = Some(field.into());
        self
    }

    /// With partition field
    #[inline]
    #[must_use]
    pub fn with_partition_field(mut self, field: impl Into<String>) -> Self {
        self.partition_field_name = Some(field.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.detector_description = Some(description.into());
        self
    }

    /// Every field name this detector refers to
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        [
            &self.field_name,
            &self.by_field_name,
            &self.over_field_name,
            &self.partition_field_name,
        ]
        .into_iter()
        .filter_map(Option::as_deref)
    }
}
