//! Datafeed configuration
//!
//! The datafeed tells the analysis engine where to read data from: source
//! indices, the query, computed fields, and polling cadence.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigError;

/// Datafeed identifier
pub type DatafeedId = String;

/// Runtime field name to computed field definition, in insertion order
pub type RuntimeMappings = IndexMap<String, JsonValue>;

/// Prefix of datafeed ids derived from job ids
pub const DATAFEED_ID_PREFIX: &str = "datafeed-";

/// Datafeed id for a job
#[inline]
#[must_use]
pub fn datafeed_id_for(job_id: &str) -> DatafeedId {
    format!("{DATAFEED_ID_PREFIX}{job_id}")
}

/// Split a comma separated index pattern title into index names
#[must_use]
pub fn split_index_pattern_names(title: &str) -> Vec<String> {
    title.split(',').map(str::to_string).collect()
}

fn empty_query() -> JsonValue {
    JsonValue::Object(Map::new())
}

/// Full datafeed definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatafeedConfig {
    #[serde(default)]
    pub datafeed_id: DatafeedId,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default = "empty_query")]
    pub query: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_mappings: Option<RuntimeMappings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_fields: Option<IndexMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggs: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_delay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices_options: Option<IndicesOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking_config: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl DatafeedConfig {
    /// A blank datafeed over the indices of `index_pattern_title`
    #[must_use]
    pub fn empty(index_pattern_title: &str) -> Self {
        Self {
            datafeed_id: String::new(),
            job_id: String::new(),
            indices: split_index_pattern_names(index_pattern_title),
            query: empty_query(),
            runtime_mappings: None,
            script_fields: None,
            aggregations: None,
            aggs: None,
            scroll_size: None,
            frequency: None,
            query_delay: None,
            indices_options: None,
            chunking_config: None,
            extra: Map::new(),
        }
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error if the JSON is not a datafeed definition
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is not a datafeed definition
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

    /// Datafeed aggregations, under either accepted key
    #[inline]
    #[must_use]
    pub fn datafeed_aggregations(&self) -> Option<&JsonValue> {
        self.aggregations.as_ref().or(self.aggs.as_ref())
    }
}

/// Index resolution options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndicesOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_wildcards: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_unavailable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_no_indices: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_throttled: Option<bool>,
}

impl IndicesOptions {
    /// True when no option is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expand_wildcards.is_none()
            && self.ignore_unavailable.is_none()
            && self.allow_no_indices.is_none()
            && self.ignore_throttled.is_none()
    }
}
