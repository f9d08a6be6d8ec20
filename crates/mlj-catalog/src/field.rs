//! Fields and field types
//!
//! A [`Field`] describes one column of the data source as the job wizard
//! sees it: its type, whether it can be aggregated, where it comes from, and
//! which detector functions may be applied to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::aggregation::AggregationId;
use crate::error::CatalogError;

/// Id of the synthetic field used by count detectors
pub const EVENT_RATE_FIELD_ID: &str = "__ml_event_rate_count__";

/// Search engine field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Keyword,
    Text,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    UnsignedLong,
    Date,
    DateNanos,
    Boolean,
    Ip,
    GeoPoint,
    GeoShape,
    Version,
    Unknown,
}

impl FieldType {
    /// All known field types
    pub const ALL: [FieldType; 19] = [
        FieldType::Keyword,
        FieldType::Text,
        FieldType::Long,
        FieldType::Integer,
        FieldType::Short,
        FieldType::Byte,
        FieldType::Double,
        FieldType::Float,
        FieldType::HalfFloat,
        FieldType::ScaledFloat,
        FieldType::UnsignedLong,
        FieldType::Date,
        FieldType::DateNanos,
        FieldType::Boolean,
        FieldType::Ip,
        FieldType::GeoPoint,
        FieldType::GeoShape,
        FieldType::Version,
        FieldType::Unknown,
    ];

    /// Wire name of the type
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Short => "short",
            FieldType::Byte => "byte",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::HalfFloat => "half_float",
            FieldType::ScaledFloat => "scaled_float",
            FieldType::UnsignedLong => "unsigned_long",
            FieldType::Date => "date",
            FieldType::DateNanos => "date_nanos",
            FieldType::Boolean => "boolean",
            FieldType::Ip => "ip",
            FieldType::GeoPoint => "geo_point",
            FieldType::GeoShape => "geo_shape",
            FieldType::Version => "version",
            FieldType::Unknown => "unknown",
        }
    }

    /// Numeric types accept every metric function
    #[inline]
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Long
                | FieldType::Integer
                | FieldType::Short
                | FieldType::Byte
                | FieldType::Double
                | FieldType::Float
                | FieldType::HalfFloat
                | FieldType::ScaledFloat
                | FieldType::UnsignedLong
        )
    }

    /// Keyword-like types accept cardinality functions
    #[inline]
    #[must_use]
    pub fn is_keyword_like(&self) -> bool {
        matches!(self, FieldType::Keyword | FieldType::Version)
    }

    /// Geo types accept `lat_long`
    #[inline]
    #[must_use]
    pub fn is_geo(&self) -> bool {
        matches!(self, FieldType::GeoPoint | FieldType::GeoShape)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownFieldType(s.to_string()))
    }
}

/// Where a field comes from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "definition", rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Mapped in the index
    #[default]
    Plain,
    /// Datafeed script field
    Script,
    /// Runtime field, with its definition
    Runtime(JsonValue),
    /// Named datafeed aggregation
    Aggregation,
}

/// A field of the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field id (usually equal to the name)
    pub id: String,
    /// Display name
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field can be aggregated
    pub aggregatable: bool,
    /// Whether the field is a time-series counter
    #[serde(default)]
    pub counter: bool,
    /// Origin of the field
    #[serde(default)]
    pub origin: FieldOrigin,
    /// Functions applicable to this field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggs: Vec<AggregationId>,
}

impl Field {
    /// Create a plain aggregatable field
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            field_type,
            aggregatable: true,
            counter: false,
            origin: FieldOrigin::Plain,
            aggs: Vec::new(),
        }
    }

    /// The synthetic event rate field used by count detectors
    #[must_use]
    pub fn event_rate() -> Self {
        Self {
            id: EVENT_RATE_FIELD_ID.to_string(),
            name: "Event rate".to_string(),
            field_type: FieldType::Integer,
            aggregatable: true,
            counter: false,
            origin: FieldOrigin::Plain,
            aggs: Vec::new(),
        }
    }

    /// Script field placeholder, typed as keyword
    #[must_use]
    pub fn script(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Keyword).with_origin(FieldOrigin::Script)
    }

    /// Named aggregation placeholder, typed as keyword
    #[must_use]
    pub fn aggregation(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Keyword).with_origin(FieldOrigin::Aggregation)
    }

    /// Runtime field built from its definition
    ///
    /// The definition is either an object with a `type` key or an array whose
    /// first element carries the type.
    #[must_use]
    pub fn runtime(name: impl Into<String>, definition: JsonValue) -> Self {
        let type_value = match &definition {
            JsonValue::Array(items) => items.first().and_then(|d| d.get("type")),
            other => other.get("type"),
        };
        let field_type = type_value
            .and_then(JsonValue::as_str)
            .and_then(|t| t.parse().ok())
            .unwrap_or(FieldType::Unknown);
        Self::new(name, field_type).with_origin(FieldOrigin::Runtime(definition))
    }

    /// With origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: FieldOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Mark the field as not aggregatable
    #[inline]
    #[must_use]
    pub fn not_aggregatable(mut self) -> Self {
        self.aggregatable = false;
        self
    }

    /// Whether this is the synthetic event rate field
    #[inline]
    #[must_use]
    pub fn is_event_rate(&self) -> bool {
        self.id == EVENT_RATE_FIELD_ID
    }

    /// Runtime definition, if this is a runtime field
    #[inline]
    #[must_use]
    pub fn runtime_definition(&self) -> Option<&JsonValue> {
        match &self.origin {
            FieldOrigin::Runtime(def) => Some(def),
            _ => None,
        }
    }

    /// Whether `agg` was assigned to this field
    #[inline]
    #[must_use]
    pub fn supports(&self, agg: AggregationId) -> bool {
        self.aggs.contains(&agg)
    }
}
