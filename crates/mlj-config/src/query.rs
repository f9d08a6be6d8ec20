//! Query DSL helpers

use mlj_catalog::Field;
use serde_json::{json, Map, Value as JsonValue};

fn frozen_tier_term() -> JsonValue {
    json!({"term": {"_tier": {"value": "data_frozen"}}})
}

fn is_populated_object(value: &JsonValue) -> bool {
    value.as_object().is_some_and(|m| !m.is_empty())
}

/// Add a clause excluding frozen-tier data to a query
///
/// `match_all` is dropped since the resulting `bool` query already matches
/// everything not excluded.
#[must_use]
pub fn add_exclude_frozen_to_query(query: Option<&JsonValue>) -> JsonValue {
    let mut query = match query {
        None | Some(JsonValue::Null) => {
            return json!({"bool": {"must_not": [frozen_tier_term()]}});
        }
        Some(JsonValue::Object(map)) => map.clone(),
        Some(other) => {
            tracing::debug!("query is not an object, replacing: {}", other);
            Map::new()
        }
    };

    query.remove("match_all");

    let existing_bool = query
        .get_mut("bool")
        .and_then(JsonValue::as_object_mut)
        .filter(|b| !b.is_empty());

    if let Some(bool_query) = existing_bool {
        let clauses = match bool_query.remove("must_not") {
            Some(JsonValue::Array(mut items)) => {
                items.push(frozen_tier_term());
                items
            }
            Some(single) if is_populated_object(&single) => vec![single, frozen_tier_term()],
            _ => vec![frozen_tier_term()],
        };
        bool_query.insert("must_not".to_string(), JsonValue::Array(clauses));
    } else {
        query.insert(
            "bool".to_string(),
            json!({"must_not": [frozen_tier_term()]}),
        );
    }

    JsonValue::Object(query)
}

/// Named sub-aggregations of a datafeed aggregation tree, as keyword fields
///
/// Walks the tree and, for every `aggregations`/`aggs` object found, emits
/// one field per child name.
#[must_use]
pub fn collect_aggregation_fields(tree: &JsonValue) -> Vec<Field> {
    let mut out = Vec::new();
    collect_aggs(tree, &mut out);
    out
}

fn collect_aggs(value: &JsonValue, out: &mut Vec<Field>) {
    let JsonValue::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        if !(child.is_object() || child.is_array()) {
            continue;
        }
        if key == "aggregations" || key == "aggs" {
            if let Some(named) = child.as_object() {
                out.extend(
                    named
                        .keys()
                        .filter(|k| *k != "aggregations" && *k != "aggs")
                        .map(Field::aggregation),
                );
            }
        }
        collect_aggs(child, out);
    }
}

/// Fields for the aggregations of a datafeed, read from its first bucket
/// aggregation
#[must_use]
pub fn datafeed_aggregation_fields(aggs: &JsonValue) -> Vec<Field> {
    aggs.as_object()
        .and_then(|m| m.values().next())
        .map(collect_aggregation_fields)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_query_becomes_must_not() {
        assert_eq!(
            add_exclude_frozen_to_query(None),
            json!({"bool": {"must_not": [{"term": {"_tier": {"value": "data_frozen"}}}]}})
        );
    }

    #[test]
    fn match_all_is_replaced() {
        let q = json!({"match_all": {}});
        assert_eq!(
            add_exclude_frozen_to_query(Some(&q)),
            json!({"bool": {"must_not": [{"term": {"_tier": {"value": "data_frozen"}}}]}})
        );
    }

    #[test]
    fn existing_must_not_array_is_extended() {
        let q = json!({"bool": {"must": [{"match": {"a": 1}}], "must_not": [{"term": {"b": 2}}]}});
        let out = add_exclude_frozen_to_query(Some(&q));
        assert_eq!(
            out,
            json!({"bool": {
                "must": [{"match": {"a": 1}}],
                "must_not": [
                    {"term": {"b": 2}},
                    {"term": {"_tier": {"value": "data_frozen"}}}
                ]
            }})
        );
    }

    #[test]
    fn single_must_not_object_is_wrapped() {
        let q = json!({"bool": {"must_not": {"term": {"b": 2}}}});
        let out = add_exclude_frozen_to_query(Some(&q));
        assert_eq!(
            out["bool"]["must_not"],
            json!([{"term": {"b": 2}}, {"term": {"_tier": {"value": "data_frozen"}}}])
        );
    }

    #[test]
    fn bool_without_must_not_gets_one() {
        let q = json!({"bool": {"filter": [{"term": {"a": 1}}]}});
        let out = add_exclude_frozen_to_query(Some(&q));
        assert_eq!(out["bool"]["filter"], json!([{"term": {"a": 1}}]));
        assert_eq!(out["bool"]["must_not"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn input_query_is_not_mutated() {
        let q = json!({"bool": {"must_not": []}});
        let _ = add_exclude_frozen_to_query(Some(&q));
        assert_eq!(q, json!({"bool": {"must_not": []}}));
    }

    #[test]
    fn collects_nested_aggregation_names() {
        let aggs = json!({
            "buckets": {
                "date_histogram": {"field": "@timestamp", "fixed_interval": "15m"},
                "aggregations": {
                    "@timestamp": {"max": {"field": "@timestamp"}},
                    "by_host": {
                        "terms": {"field": "host"},
                        "aggs": {"bytes_avg": {"avg": {"field": "bytes"}}}
                    }
                }
            }
        });
        let names: Vec<_> = datafeed_aggregation_fields(&aggs)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["@timestamp", "by_host", "bytes_avg"]);
    }
}
