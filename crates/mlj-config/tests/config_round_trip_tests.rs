//! Config parsing tests
//!
//! Loads realistic job and datafeed definitions and checks what the helpers
//! derive from them.

use mlj_catalog::AggregationId;
use mlj_config::{
    datafeed_aggregation_fields, filter_runtime_mappings, DatafeedConfig, JobConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const JOB: &str = r#"{
  "job_id": "web-latency",
  "description": "Latency by host",
  "groups": ["web"],
  "analysis_config": {
    "bucket_span": "15m",
    "summary_count_field_name": "doc_count",
    "detectors": [
      {"function": "high_mean", "field_name": "rt_latency", "partition_field_name": "host"},
      {"function": "non_zero_count", "by_field_name": "rt_status"}
    ],
    "influencers": ["host", "rt_status"]
  },
  "analysis_limits": {"model_memory_limit": "64mb"},
  "data_description": {"time_field": "@timestamp", "time_format": "epoch_ms"},
  "results_index_name": "custom-web",
  "custom_settings": {"created_by": "multi-metric-wizard", "custom_urls": [
    {"url_name": "Discover", "url_value": "discover#/?host=$host$"}
  ]}
}"#;

const DATAFEED: &str = r#"{
  "datafeed_id": "datafeed-web-latency",
  "job_id": "web-latency",
  "indices": ["web-*"],
  "query": {"bool": {"must": [{"match_all": {}}]}},
  "runtime_mappings": {
    "rt_latency": {"type": "double", "script": "emit(doc['latency_us'].value / 1000.0)"},
    "rt_status": {"type": "keyword", "script": "emit(doc['status'].value)"},
    "rt_unused": {"type": "keyword", "script": "emit('x')"}
  },
  "aggregations": {
    "buckets": {
      "date_histogram": {"field": "@timestamp", "fixed_interval": "90s"},
      "aggregations": {
        "@timestamp": {"max": {"field": "@timestamp"}},
        "rt_latency": {"avg": {"field": "rt_latency"}}
      }
    }
  },
  "scroll_size": 1000,
  "indices_options": {"ignore_unavailable": true},
  "delayed_data_check_config": {"enabled": true}
}"#;

#[test]
fn job_parses_all_modelled_fields() {
    let job = JobConfig::from_json(JOB).unwrap();
    assert_eq!(job.analysis_config.detectors.len(), 2);
    assert_eq!(job.analysis_config.detectors[1].function, AggregationId::NonZeroCount);
    assert_eq!(
        job.analysis_limits.as_ref().and_then(|l| l.model_memory_limit.as_deref()),
        Some("64mb")
    );
    assert!(job.has_dedicated_results_index());
    let urls = job.custom_settings.as_ref().unwrap().custom_urls.as_ref().unwrap();
    assert_eq!(urls[0].url_name, "Discover");
}

#[test]
fn datafeed_keeps_unmodelled_keys() {
    let df = DatafeedConfig::from_json(DATAFEED).unwrap();
    assert_eq!(df.extra["delayed_data_check_config"], json!({"enabled": true}));
    let back = serde_json::to_value(&df).unwrap();
    assert_eq!(back["delayed_data_check_config"], json!({"enabled": true}));
    assert_eq!(back["scroll_size"], json!(1000));
}

#[test]
fn filtering_real_configs() {
    let job = JobConfig::from_json(JOB).unwrap();
    let df = DatafeedConfig::from_json(DATAFEED).unwrap();
    let filtered = filter_runtime_mappings(&job, &df);

    let kept: Vec<_> = filtered.runtime_mappings.keys().cloned().collect();
    let dropped: Vec<_> = filtered.discarded_mappings.keys().cloned().collect();
    assert_eq!(kept, vec!["rt_latency", "rt_status"]);
    assert_eq!(dropped, vec!["rt_unused"]);
}

#[test]
fn aggregation_fields_from_real_datafeed() {
    let df = DatafeedConfig::from_json(DATAFEED).unwrap();
    let fields = datafeed_aggregation_fields(df.datafeed_aggregations().unwrap());
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["@timestamp", "rt_latency"]);
}

#[test]
fn job_survives_yaml_round_trip() {
    let job = JobConfig::from_json(JOB).unwrap();
    let yaml = serde_yaml::to_string(&job).unwrap();
    assert_eq!(JobConfig::from_yaml(&yaml).unwrap(), job);
}
