//! MLJ Config
//!
//! Wire types and pure helpers for anomaly-detection job construction.
//!
//! - [`JobConfig`] / [`Detector`]: the job definition
//! - [`DatafeedConfig`]: where and how the job reads data
//! - [`interval`]: bucket span and frequency strings
//! - [`filter_runtime_mappings`]: the runtime fields a job actually uses
//! - [`query`]: query rewriting and aggregation-tree walking
//!
//! # Example
//!
//! ```rust
//! use mlj_catalog::AggregationId;
//! use mlj_config::{filter_runtime_mappings, DatafeedConfig, Detector, JobConfig};
//! use serde_json::json;
//!
//! let mut job = JobConfig::empty();
//! job.analysis_config.detectors.push(Detector::new(AggregationId::Mean).with_field("hour"));
//!
//! let mut datafeed = DatafeedConfig::empty("logs-*");
//! datafeed.runtime_mappings = Some(
//!     [("hour".to_string(), json!({"type": "long"})), ("day".to_string(), json!({"type": "long"}))]
//!         .into_iter()
//!         .collect(),
//! );
//!
//! let filtered = filter_runtime_mappings(&job, &datafeed);
//! assert_eq!(filtered.runtime_mappings.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod datafeed;
pub mod error;
pub mod interval;
pub mod job;
pub mod query;
pub mod runtime;

pub use datafeed::{
    datafeed_id_for, split_index_pattern_names, DatafeedConfig, DatafeedId, IndicesOptions,
    RuntimeMappings, DATAFEED_ID_PREFIX,
};
pub use error::ConfigError;
pub use interval::{interval_ms, parse_interval};
pub use job::{
    AnalysisConfig, AnalysisLimits, CreatedBy, CustomSettings, CustomUrl, DataDescription,
    Detector, JobConfig, JobId, ModelPlotConfig, PerPartitionCategorization,
    SHARED_RESULTS_INDEX_NAME,
};
pub use query::{add_exclude_frozen_to_query, collect_aggregation_fields, datafeed_aggregation_fields};
pub use runtime::{filter_runtime_mappings, find_fields_in_job, FilteredRuntimeMappings};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
