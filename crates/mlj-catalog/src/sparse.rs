//! Sparse-data function substitution
//!
//! Count and sum detectors have sparse-aware counterparts that ignore empty
//! buckets. The table is fixed: count, high_count, low_count, sum, high_sum
//! and low_sum each have exactly one counterpart. Every other function has
//! none and passes through unchanged.

use crate::aggregation::AggregationId;

const PAIRS: [(AggregationId, AggregationId); 6] = [
    (AggregationId::Count, AggregationId::NonZeroCount),
    (AggregationId::HighCount, AggregationId::HighNonZeroCount),
    (AggregationId::LowCount, AggregationId::LowNonZeroCount),
    (AggregationId::Sum, AggregationId::NonNullSum),
    (AggregationId::HighSum, AggregationId::HighNonNullSum),
    (AggregationId::LowSum, AggregationId::LowNonNullSum),
];

/// Sparse-aware counterpart of a standard function
#[must_use]
pub fn to_sparse(id: AggregationId) -> AggregationId {
    PAIRS
        .iter()
        .find(|(standard, _)| *standard == id)
        .map_or(id, |(_, sparse)| *sparse)
}

/// Standard counterpart of a sparse-aware function
#[must_use]
pub fn to_standard(id: AggregationId) -> AggregationId {
    PAIRS
        .iter()
        .find(|(_, sparse)| *sparse == id)
        .map_or(id, |(standard, _)| *standard)
}

/// Function to use for `id` given the sparse data setting
#[inline]
#[must_use]
pub fn apply_sparse(id: AggregationId, sparse_data: bool) -> AggregationId {
    if sparse_data {
        to_sparse(id)
    } else {
        to_standard(id)
    }
}

/// Whether `id` is one of the sparse-aware variants
#[inline]
#[must_use]
pub fn is_sparse_variant(id: AggregationId) -> bool {
    PAIRS.iter().any(|(_, sparse)| *sparse == id)
}

/// Whether `id` has a sparse-aware counterpart
#[inline]
#[must_use]
pub fn has_sparse_variant(id: AggregationId) -> bool {
    PAIRS.iter().any(|(standard, _)| *standard == id)
}
