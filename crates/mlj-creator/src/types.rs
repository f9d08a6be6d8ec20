//! Core types shared by the creator and the runner

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mlj_catalog::Field;
use mlj_config::{CreatedBy, RuntimeMappings};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Wizard that owns a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// One metric over time
    SingleMetric,
    /// Several metrics, optionally split
    MultiMetric,
    /// Entities compared against their population
    Population,
    /// Free-form detectors
    #[default]
    Advanced,
    /// Counts or rare message categories
    Categorization,
    /// Rare values
    Rare,
    /// Unusual locations
    Geo,
}

impl JobType {
    /// Label recorded in the job's custom settings
    #[must_use]
    pub fn created_by(&self) -> CreatedBy {
        match self {
            Self::SingleMetric => CreatedBy::SINGLE_METRIC,
            Self::MultiMetric => CreatedBy::MULTI_METRIC,
            Self::Population => CreatedBy::POPULATION,
            Self::Advanced => CreatedBy::ADVANCED,
            Self::Categorization => CreatedBy::CATEGORIZATION,
            Self::Rare => CreatedBy::RARE,
            Self::Geo => CreatedBy::GEO,
        }
    }
}

/// The data view a job is created against
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSource {
    /// Saved object id, absent for ad-hoc views
    pub id: Option<String>,
    /// Index pattern, comma separated
    pub title: String,
    /// Human name, defaults to the title
    pub name: Option<String>,
    /// Default time field
    pub time_field_name: Option<String>,
    /// Runtime fields defined on the view itself
    pub runtime_field_map: Option<RuntimeMappings>,
    /// Mapped fields
    pub fields: Vec<Field>,
}

impl DataSource {
    /// Create a data source over an index pattern
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// With saved object id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With time field
    #[inline]
    #[must_use]
    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field_name = Some(field.into());
        self
    }

    /// With a runtime field
    #[must_use]
    pub fn with_runtime_field(mut self, name: impl Into<String>, definition: JsonValue) -> Self {
        self.runtime_field_map
            .get_or_insert_with(RuntimeMappings::new)
            .insert(name.into(), definition);
        self
    }

    /// With mapped fields
    #[inline]
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// `name`, or `name (title)` when the two differ
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if name != self.title => format!("{name} ({})", self.title),
            _ => self.title.clone(),
        }
    }
}

/// A saved search the job may be based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    /// Saved object id
    pub id: String,
    /// Saved search title
    pub title: String,
    /// Query DSL
    #[serde(default)]
    pub query: JsonValue,
    /// Filters applied on top of the query
    #[serde(default)]
    pub filters: Vec<JsonValue>,
}

/// Query and filters of a saved search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSearchQuery {
    /// Query DSL
    pub query: JsonValue,
    /// Filter clauses
    pub filters: Vec<JsonValue>,
}

/// Scheduled events calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Calendar id
    pub calendar_id: String,
    /// Jobs and groups the calendar applies to
    #[serde(default)]
    pub job_ids: Vec<String>,
    /// Free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Calendar {
    /// Empty calendar with no jobs
    #[must_use]
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            job_ids: Vec::new(),
            description: None,
        }
    }
}

/// Callback receiving progress updates
pub type ProgressSubscriber = Arc<dyn Fn(i32) + Send + Sync>;

/// Shared flag that stops progress polling
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Handle in the running state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every poll sharing this handle to stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`stop`](Self::stop) was called
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_includes_title_when_different() {
        let ds = DataSource::new("logs-*").with_name("Logs");
        assert_eq!(ds.display_name(), "Logs (logs-*)");
        assert_eq!(DataSource::new("logs-*").with_name("logs-*").display_name(), "logs-*");
        assert_eq!(DataSource::new("logs-*").display_name(), "logs-*");
    }

    #[test]
    fn runtime_fields_accumulate_in_order() {
        let ds = DataSource::new("logs-*")
            .with_runtime_field("b", json!({"type": "long"}))
            .with_runtime_field("a", json!({"type": "keyword"}));
        let keys: Vec<_> = ds.runtime_field_map.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn job_type_labels() {
        assert_eq!(JobType::Rare.created_by().as_str(), "rare-wizard");
        assert_eq!(JobType::default(), JobType::Advanced);
    }

    #[test]
    fn stop_handle_is_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_stopped());
        handle.stop();
        assert!(clone.is_stopped());
    }
}
