//! Runtime mapping filtering
//!
//! A data source may define many runtime fields; only the ones the job
//! actually uses should be submitted with the datafeed.

use indexmap::IndexSet;
use serde_json::Value as JsonValue;

use crate::datafeed::{DatafeedConfig, RuntimeMappings};
use crate::job::JobConfig;

/// Runtime mappings split by whether the job references them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredRuntimeMappings {
    /// Mappings referenced by the job, in reference order
    pub runtime_mappings: RuntimeMappings,
    /// Mappings nothing references, in mapping order
    pub discarded_mappings: RuntimeMappings,
}

/// Split the datafeed's runtime mappings into used and unused
///
/// A mapping is used when its name is a detector field (analysed, by, over
/// or partition), the categorization field, the summary count field, an
/// influencer, a `field` inside the datafeed aggregations, or any key
/// anywhere in the datafeed query.
#[must_use]
pub fn filter_runtime_mappings(job: &JobConfig, datafeed: &DatafeedConfig) -> FilteredRuntimeMappings {
    let mappings = match &datafeed.runtime_mappings {
        Some(rm) if !rm.is_empty() => rm,
        _ => return FilteredRuntimeMappings::default(),
    };

    let used = find_fields_in_job(job, datafeed);

    let runtime_mappings = used
        .iter()
        .filter_map(|name| mappings.get(name).map(|def| (name.clone(), def.clone())))
        .collect();

    let discarded_mappings = mappings
        .iter()
        .filter(|(name, _)| !used.contains(*name))
        .map(|(name, def)| (name.clone(), def.clone()))
        .collect();

    FilteredRuntimeMappings {
        runtime_mappings,
        discarded_mappings,
    }
}

/// Every field name the job or its datafeed may reference
#[must_use]
pub fn find_fields_in_job(job: &JobConfig, datafeed: &DatafeedConfig) -> IndexSet<String> {
    let mut used = IndexSet::new();
    let analysis = &job.analysis_config;

    for detector in &analysis.detectors {
        used.extend(detector.referenced_fields().map(str::to_string));
    }
    used.extend(analysis.categorization_field_name.iter().cloned());
    used.extend(analysis.summary_count_field_name.iter().cloned());
    used.extend(analysis.influencers.iter().cloned());

    if let Some(aggs) = datafeed.datafeed_aggregations() {
        find_fields_in_agg(aggs, &mut used);
    }
    find_fields_in_query(&datafeed.query, &mut used);

    used
}

fn find_fields_in_agg(value: &JsonValue, out: &mut IndexSet<String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, val) in map {
                match val {
                    JsonValue::String(field) if key == "field" => {
                        out.insert(field.clone());
                    }
                    JsonValue::Object(_) | JsonValue::Array(_) => find_fields_in_agg(val, out),
                    _ => {}
                }
            }
        }
        JsonValue::Array(items) => items.iter().for_each(|v| find_fields_in_agg(v, out)),
        _ => {}
    }
}

// Most query keys are not fields; collecting all of them keeps any runtime
// field the query touches.
fn find_fields_in_query(value: &JsonValue, out: &mut IndexSet<String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, val) in map {
                out.insert(key.clone());
                find_fields_in_query(val, out);
            }
        }
        JsonValue::Array(items) => items.iter().for_each(|v| find_fields_in_query(v, out)),
        _ => {}
    }
}
