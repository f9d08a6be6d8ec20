//! Error types for the catalog

/// Catalog lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Aggregation id not known to the catalog
    #[error("unknown aggregation: {0}")]
    UnknownAggregation(String),

    /// Field type not known to the catalog
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}
