//! MLJ Catalog
//!
//! Static metadata for anomaly-detection job construction.
//!
//! # Core Concepts
//!
//! - [`Field`]: a data source column with its type and origin
//! - [`AggregationId`]: a detector function id (`count`, `mean`, ...)
//! - [`Aggregation`]: catalog entry describing a detector function
//! - [`combine_fields_and_aggs`]: which functions apply to which fields
//! - [`sparse`]: the sparse-data function substitution table
//!
//! # Example
//!
//! ```rust
//! use mlj_catalog::{catalog, combine_fields_and_aggs, AggregationId, Field, FieldType};
//!
//! let caps = combine_fields_and_aggs(vec![Field::new("bytes", FieldType::Long)], catalog());
//! assert!(caps.field("bytes").unwrap().supports(AggregationId::Mean));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregation;
pub mod combine;
pub mod error;
pub mod field;
pub mod sparse;

pub use aggregation::{catalog, Aggregation, AggregationId, AggregationKind, ModelPlotAgg};
pub use combine::{combine_fields_and_aggs, FieldCapabilities};
pub use error::CatalogError;
pub use field::{Field, FieldOrigin, FieldType, EVENT_RATE_FIELD_ID};
pub use sparse::{apply_sparse, to_sparse, to_standard};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
