//! Anomaly-detection function catalog
//!
//! Every detector function the analysis engine understands, with the
//! metadata the job wizards need: a display title, the equivalent search
//! aggregation (if any), and the aggregations used to draw model plot bounds.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Detector function id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationId {
    Count,
    HighCount,
    LowCount,
    NonZeroCount,
    HighNonZeroCount,
    LowNonZeroCount,
    DistinctCount,
    HighDistinctCount,
    LowDistinctCount,
    Metric,
    Mean,
    HighMean,
    LowMean,
    Median,
    HighMedian,
    LowMedian,
    Min,
    Max,
    Sum,
    HighSum,
    LowSum,
    NonNullSum,
    HighNonNullSum,
    LowNonNullSum,
    Rare,
    FreqRare,
    InfoContent,
    HighInfoContent,
    LowInfoContent,
    TimeOfDay,
    TimeOfWeek,
    LatLong,
    Varp,
    HighVarp,
    LowVarp,
}

impl AggregationId {
    /// All function ids, in catalog order
    pub const ALL: [AggregationId; 35] = [
        AggregationId::Count,
        AggregationId::HighCount,
        AggregationId::LowCount,
        AggregationId::NonZeroCount,
        AggregationId::HighNonZeroCount,
        AggregationId::LowNonZeroCount,
        AggregationId::DistinctCount,
        AggregationId::HighDistinctCount,
        AggregationId::LowDistinctCount,
        AggregationId::Metric,
        AggregationId::Mean,
        AggregationId::HighMean,
        AggregationId::LowMean,
        AggregationId::Median,
        AggregationId::HighMedian,
        AggregationId::LowMedian,
        AggregationId::Min,
        AggregationId::Max,
        AggregationId::Sum,
        AggregationId::HighSum,
        AggregationId::LowSum,
        AggregationId::NonNullSum,
        AggregationId::HighNonNullSum,
        AggregationId::LowNonNullSum,
        AggregationId::Rare,
        AggregationId::FreqRare,
        AggregationId::InfoContent,
        AggregationId::HighInfoContent,
        AggregationId::LowInfoContent,
        AggregationId::TimeOfDay,
        AggregationId::TimeOfWeek,
        AggregationId::LatLong,
        AggregationId::Varp,
        AggregationId::HighVarp,
        AggregationId::LowVarp,
    ];

    /// Wire name of the function
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationId::Count => "count",
            AggregationId::HighCount => "high_count",
            AggregationId::LowCount => "low_count",
            AggregationId::NonZeroCount => "non_zero_count",
            AggregationId::HighNonZeroCount => "high_non_zero_count",
            AggregationId::LowNonZeroCount => "low_non_zero_count",
            AggregationId::DistinctCount => "distinct_count",
            AggregationId::HighDistinctCount => "high_distinct_count",
            AggregationId::LowDistinctCount => "low_distinct_count",
            AggregationId::Metric => "metric",
            AggregationId::Mean => "mean",
            AggregationId::HighMean => "high_mean",
            AggregationId::LowMean => "low_mean",
            AggregationId::Median => "median",
            AggregationId::HighMedian => "high_median",
            AggregationId::LowMedian => "low_median",
            AggregationId::Min => "min",
            AggregationId::Max => "max",
            AggregationId::Sum => "sum",
            AggregationId::HighSum => "high_sum",
            AggregationId::LowSum => "low_sum",
            AggregationId::NonNullSum => "non_null_sum",
            AggregationId::HighNonNullSum => "high_non_null_sum",
            AggregationId::LowNonNullSum => "low_non_null_sum",
            AggregationId::Rare => "rare",
            AggregationId::FreqRare => "freq_rare",
            AggregationId::InfoContent => "info_content",
            AggregationId::HighInfoContent => "high_info_content",
            AggregationId::LowInfoContent => "low_info_content",
            AggregationId::TimeOfDay => "time_of_day",
            AggregationId::TimeOfWeek => "time_of_week",
            AggregationId::LatLong => "lat_long",
            AggregationId::Varp => "varp",
            AggregationId::HighVarp => "high_varp",
            AggregationId::LowVarp => "low_varp",
        }
    }

    /// Catalog entry for this id
    #[inline]
    #[must_use]
    pub fn aggregation(&self) -> &'static Aggregation {
        Aggregation::lookup(*self)
    }
}

impl fmt::Display for AggregationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownAggregation(s.to_string()))
    }
}

/// Whether a function counts events or summarises a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    /// Operates on event counts, takes no field
    Count,
    /// Operates on the values of a field
    Metric,
}

/// Search aggregations used to draw the model plot bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelPlotAgg {
    pub min: &'static str,
    pub max: &'static str,
}

/// Catalog entry for a detector function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    /// Function id
    pub id: AggregationId,
    /// Display title
    pub title: &'static str,
    /// Name of the equivalent visualisation aggregation
    pub visualisation_name: Option<&'static str>,
    /// Name of the equivalent search aggregation
    pub dsl_name: Option<&'static str>,
    /// Count or metric
    pub kind: AggregationKind,
    /// Model plot bounds
    pub model_plot: Option<ModelPlotAgg>,
}

const MIN_MAX: Option<ModelPlotAgg> = Some(ModelPlotAgg { min: "min", max: "max" });
const AVG_AVG: Option<ModelPlotAgg> = Some(ModelPlotAgg { min: "avg", max: "avg" });
const SUM_SUM: Option<ModelPlotAgg> = Some(ModelPlotAgg { min: "sum", max: "sum" });
const CARD_CARD: Option<ModelPlotAgg> = Some(ModelPlotAgg {
    min: "cardinality",
    max: "cardinality",
});

const fn entry(
    id: AggregationId,
    title: &'static str,
    es: Option<&'static str>,
    kind: AggregationKind,
    model_plot: Option<ModelPlotAgg>,
) -> Aggregation {
    Aggregation {
        id,
        title,
        visualisation_name: es,
        dsl_name: es,
        kind,
        model_plot,
    }
}

use AggregationKind::{Count as C, Metric as M};

static CATALOG: [Aggregation; 35] = [
    entry(AggregationId::Count, "Count", Some("count"), C, MIN_MAX),
    entry(AggregationId::HighCount, "High count", Some("count"), C, MIN_MAX),
    entry(AggregationId::LowCount, "Low count", Some("count"), C, MIN_MAX),
    entry(AggregationId::NonZeroCount, "Non zero count", None, C, None),
    entry(AggregationId::HighNonZeroCount, "High non zero count", None, C, None),
    entry(AggregationId::LowNonZeroCount, "Low non zero count", None, C, None),
    entry(AggregationId::DistinctCount, "Distinct count", Some("cardinality"), M, CARD_CARD),
    entry(AggregationId::HighDistinctCount, "High distinct count", Some("cardinality"), M, CARD_CARD),
    entry(AggregationId::LowDistinctCount, "Low distinct count", Some("cardinality"), M, CARD_CARD),
    entry(AggregationId::Metric, "Metric", Some("avg"), M, MIN_MAX),
    entry(AggregationId::Mean, "Mean", Some("avg"), M, AVG_AVG),
    entry(AggregationId::HighMean, "High mean", Some("avg"), M, AVG_AVG),
    entry(AggregationId::LowMean, "Low mean", Some("avg"), M, AVG_AVG),
    Aggregation {
        id: AggregationId::Median,
        title: "Median",
        visualisation_name: Some("median"),
        dsl_name: Some("percentiles"),
        kind: M,
        model_plot: MIN_MAX,
    },
    Aggregation {
        id: AggregationId::HighMedian,
        title: "High median",
        visualisation_name: Some("median"),
        dsl_name: Some("percentiles"),
        kind: M,
        model_plot: MIN_MAX,
    },
    Aggregation {
        id: AggregationId::LowMedian,
        title: "Low median",
        visualisation_name: Some("median"),
        dsl_name: Some("percentiles"),
        kind: M,
        model_plot: MIN_MAX,
    },
    entry(AggregationId::Min, "Min", Some("min"), M, MIN_MAX),
    entry(AggregationId::Max, "Max", Some("max"), M, MIN_MAX),
    entry(AggregationId::Sum, "Sum", Some("sum"), M, SUM_SUM),
    entry(AggregationId::HighSum, "High sum", Some("sum"), M, SUM_SUM),
    entry(AggregationId::LowSum, "Low sum", Some("sum"), M, SUM_SUM),
    entry(AggregationId::NonNullSum, "Non null sum", None, M, None),
    entry(AggregationId::HighNonNullSum, "High non null sum", None, M, None),
    entry(AggregationId::LowNonNullSum, "Low non null sum", None, M, None),
    entry(AggregationId::Rare, "Rare", None, C, None),
    entry(AggregationId::FreqRare, "Freq rare", None, C, None),
    entry(AggregationId::InfoContent, "Info content", None, M, None),
    entry(AggregationId::HighInfoContent, "High info content", None, M, None),
    entry(AggregationId::LowInfoContent, "Low info content", None, M, None),
    entry(AggregationId::TimeOfDay, "Time of day", None, C, None),
    entry(AggregationId::TimeOfWeek, "Time of week", None, C, None),
    entry(AggregationId::LatLong, "Lat long", None, M, None),
    entry(AggregationId::Varp, "varp", None, M, None),
    entry(AggregationId::HighVarp, "High varp", None, M, None),
    entry(AggregationId::LowVarp, "Low varp", None, M, None),
];

static INDEX: Lazy<HashMap<AggregationId, &'static Aggregation>> =
    Lazy::new(|| CATALOG.iter().map(|a| (a.id, a)).collect());

/// The full function catalog
#[inline]
#[must_use]
pub fn catalog() -> &'static [Aggregation] {
    &CATALOG
}

impl Aggregation {
    /// Look up a catalog entry; total over [`AggregationId`]
    #[must_use]
    pub fn lookup(id: AggregationId) -> &'static Aggregation {
        INDEX[&id]
    }

    /// Whether the search engine has an equivalent aggregation
    #[inline]
    #[must_use]
    pub fn has_es_equivalent(&self) -> bool {
        self.dsl_name.is_some()
    }

    /// Whether the function operates on a field
    #[inline]
    #[must_use]
    pub fn takes_field(&self) -> bool {
        self.kind == AggregationKind::Metric
    }
}
