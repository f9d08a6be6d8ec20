//! Field and function combination
//!
//! Decides which detector functions can be applied to which fields, based on
//! field type.

use std::collections::BTreeMap;

use crate::aggregation::{Aggregation, AggregationId, AggregationKind};
use crate::field::{Field, FieldType};

/// Fields with their applicable functions, plus the reverse index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCapabilities {
    /// Input fields, with `aggs` filled in
    pub fields: Vec<Field>,
    /// Field ids accepted by each function
    pub field_ids: BTreeMap<AggregationId, Vec<String>>,
}

impl FieldCapabilities {
    /// Field ids accepted by `agg`
    #[must_use]
    pub fn fields_for(&self, agg: AggregationId) -> &[String] {
        self.field_ids.get(&agg).map_or(&[], Vec::as_slice)
    }

    /// Look up a field by id
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// Assign metric functions to fields by type
///
/// - `lat_long` takes geo fields only
/// - the info content family takes text fields, and everything the distinct
///   count family takes
/// - the distinct count family takes keyword and ip fields, and everything a
///   plain metric takes
/// - every metric function takes numeric fields
///
/// Count functions take no field. Non-aggregatable fields are skipped.
#[must_use]
pub fn combine_fields_and_aggs(fields: Vec<Field>, aggs: &[Aggregation]) -> FieldCapabilities {
    let mut caps = FieldCapabilities {
        fields,
        field_ids: BTreeMap::new(),
    };

    for agg in aggs.iter().filter(|a| a.kind == AggregationKind::Metric) {
        let accepts: fn(FieldType) -> bool = match agg.id {
            AggregationId::LatLong => |t| t.is_geo(),
            AggregationId::InfoContent
            | AggregationId::HighInfoContent
            | AggregationId::LowInfoContent => {
                |t| t == FieldType::Text || t.is_keyword_like() || t == FieldType::Ip || t.is_numeric()
            }
            AggregationId::DistinctCount
            | AggregationId::HighDistinctCount
            | AggregationId::LowDistinctCount => {
                |t| t.is_keyword_like() || t == FieldType::Ip || t.is_numeric()
            }
            _ => |t| t.is_numeric(),
        };

        for field in caps.fields.iter_mut() {
            if field.aggregatable && accepts(field.field_type) {
                field.aggs.push(agg.id);
                caps.field_ids
                    .entry(agg.id)
                    .or_default()
                    .push(field.id.clone());
            }
        }
    }

    caps
}
