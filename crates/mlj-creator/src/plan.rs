//! Wizard plans
//!
//! A plan is a declarative description of what a wizard would configure,
//! written as YAML or JSON:
//!
//! ```yaml
//! data_source:
//!   title: web-logs-*
//!   time_field: "@timestamp"
//!   fields:
//!     - { name: bytes, type: long }
//!     - { name: host, type: keyword }
//! job_type: multi_metric
//! job_id: web-bytes
//! bucket_span: 15m
//! detectors:
//!   - { function: mean, field: bytes, partition: host }
//! influencers: [host]
//! ```

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use mlj_catalog::sparse::is_sparse_variant;
use mlj_catalog::{to_standard, Aggregation, AggregationId, Field, FieldType};
use mlj_config::{CreatedBy, Detector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::api::{CalendarService, MlApi};
use crate::creator::JobCreator;
use crate::error::PlanError;
use crate::settings::CreatorSettings;
use crate::types::{Calendar, DataSource, JobType};

fn yes() -> bool {
    true
}

/// A mapped field of the plan's data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanField {
    /// Field name
    pub name: String,
    /// Mapped type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Defaults to true
    #[serde(default = "yes")]
    pub aggregatable: bool,
}

/// Data source section of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDataSource {
    /// Index pattern
    pub title: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Time field
    #[serde(default)]
    pub time_field: Option<String>,
    /// Mapped fields
    #[serde(default)]
    pub fields: Vec<PlanField>,
    /// Runtime field definitions keyed by name
    #[serde(default)]
    pub runtime_fields: IndexMap<String, JsonValue>,
}

impl PlanDataSource {
    fn to_data_source(&self) -> DataSource {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let field = Field::new(&f.name, f.field_type);
                if f.aggregatable {
                    field
                } else {
                    field.not_aggregatable()
                }
            })
            .collect();
        DataSource {
            id: None,
            title: self.title.clone(),
            name: self.name.clone(),
            time_field_name: self.time_field.clone(),
            runtime_field_map: (!self.runtime_fields.is_empty()).then(|| self.runtime_fields.clone()),
            fields,
        }
    }
}

/// One detector of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDetector {
    /// Function id, e.g. `mean` or `high_count`
    pub function: String,
    /// Field for metric functions
    #[serde(default)]
    pub field: Option<String>,
    /// `by_field_name`
    #[serde(default)]
    pub by: Option<String>,
    /// `over_field_name`
    #[serde(default)]
    pub over: Option<String>,
    /// `partition_field_name`
    #[serde(default)]
    pub partition: Option<String>,
    /// Detector description
    #[serde(default)]
    pub description: Option<String>,
}

/// Declarative job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WizardPlan {
    /// Data the job reads
    pub data_source: PlanDataSource,
    /// Owning wizard
    #[serde(default)]
    pub job_type: JobType,
    /// Job id; the datafeed id is derived from it
    pub job_id: String,
    /// Job description
    #[serde(default)]
    pub description: Option<String>,
    /// Job groups
    #[serde(default)]
    pub groups: Vec<String>,
    /// Bucket span, e.g. `15m`
    pub bucket_span: String,
    /// Detectors in order
    #[serde(default)]
    pub detectors: Vec<PlanDetector>,
    /// Fields to attribute anomalies to
    #[serde(default)]
    pub influencers: Vec<String>,
    /// Use sparse-data function variants
    #[serde(default)]
    pub sparse_data: bool,
    /// Memory limit, e.g. `64mb`
    #[serde(default)]
    pub model_memory_limit: Option<String>,
    /// Write results to an index named after the job
    #[serde(default)]
    pub dedicated_index: bool,
    /// Enable model plot
    #[serde(default)]
    pub model_plot: bool,
    /// Overrides the job type's label
    #[serde(default)]
    pub created_by: Option<String>,
    /// Datafeed query, `match_all` when absent
    #[serde(default)]
    pub query: Option<JsonValue>,
    /// Calendars to add the job to
    #[serde(default)]
    pub calendars: Vec<String>,
}

impl WizardPlan {
    /// Parse a YAML plan
    ///
    /// # Errors
    /// Returns error if the text is not a valid plan
    pub fn from_yaml_str(text: &str) -> Result<Self, PlanError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a JSON plan
    ///
    /// # Errors
    /// Returns error if the text is not a valid plan
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a plan; `.json` files are read as JSON, anything else as YAML
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Configure a job creator as the plan describes
    ///
    /// # Errors
    /// Returns error for unknown functions, or metric functions without a
    /// field
    pub fn build(
        &self,
        api: Arc<dyn MlApi>,
        calendar_service: Arc<dyn CalendarService>,
        settings: CreatorSettings,
    ) -> Result<JobCreator, PlanError> {
        let functions = self
            .detectors
            .iter()
            .map(|d| d.function.parse::<AggregationId>())
            .collect::<Result<Vec<_>, _>>()?;

        let query = self.query.clone().unwrap_or_else(|| json!({"match_all": {}}));
        let mut creator = JobCreator::new(
            api,
            calendar_service,
            self.data_source.to_data_source(),
            None,
            query,
            settings,
        )
        .with_job_type(self.job_type);

        creator.set_job_id(&self.job_id);
        if let Some(description) = &self.description {
            creator.set_description(description);
        }
        creator.set_groups(self.groups.clone());
        creator.set_bucket_span(&self.bucket_span);
        creator.set_sparse_data(self.sparse_data || functions.iter().copied().any(is_sparse_variant));

        for (index, (plan, function)) in self.detectors.iter().zip(functions).enumerate() {
            let aggregation = *Aggregation::lookup(to_standard(function));
            let mut detector = Detector::new(function);
            let field = if aggregation.takes_field() {
                let name = plan.field.as_deref().ok_or_else(|| PlanError::MissingField {
                    index,
                    function: function.to_string(),
                })?;
                detector = detector.with_field(name);
                creator
                    .find_field(name)
                    .unwrap_or_else(|| Field::new(name, FieldType::Unknown))
            } else {
                Field::event_rate()
            };
            if let Some(by) = &plan.by {
                detector = detector.with_by_field(by);
            }
            if let Some(over) = &plan.over {
                detector = detector.with_over_field(over);
            }
            if let Some(partition) = &plan.partition {
                detector = detector.with_partition_field(partition);
            }
            if let Some(description) = &plan.description {
                detector = detector.with_description(description);
            }
            creator.add_detector(detector, aggregation, field);
        }

        for influencer in &self.influencers {
            creator.add_influencer(influencer.as_str());
        }
        creator.set_model_memory_limit(self.model_memory_limit.as_deref());
        creator.set_use_dedicated_index(self.dedicated_index);
        if self.model_plot {
            creator.set_model_plot(true);
        }
        if let Some(label) = &self.created_by {
            creator.set_created_by(Some(CreatedBy::custom(label.as_str())));
        }
        creator.set_calendars(self.calendars.iter().map(Calendar::new).collect());

        tracing::debug!(job_id = %self.job_id, detectors = self.detectors.len(), "plan built");
        Ok(creator)
    }
}
