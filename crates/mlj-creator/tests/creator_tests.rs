//! Job creator configuration tests
//!
//! Detector alignment, sparse substitution, optional settings cleanup, and
//! loading existing jobs.

use mlj_catalog::{to_standard, Aggregation, AggregationId, Field, FieldType};
use mlj_config::{DatafeedConfig, Detector, JobConfig};
use mlj_creator::{CreatorSettings, JobCreator};
use mlj_test_utils::{
    configured_creator, sample_creator, sample_data_source, ApiCall, RecordingApi,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value as JsonValue};

fn add(creator: &mut JobCreator, id: AggregationId, field: &str) {
    let aggregation = *Aggregation::lookup(id);
    let mut detector = Detector::new(id);
    if aggregation.takes_field() {
        detector = detector.with_field(field);
    }
    let field = creator
        .find_field(field)
        .unwrap_or_else(|| Field::new(field, FieldType::Unknown));
    creator.add_detector(detector, aggregation, field);
}

fn assert_aligned(creator: &JobCreator) {
    let detectors = creator.detectors();
    assert_eq!(detectors.len(), creator.aggregations().len());
    assert_eq!(detectors.len(), creator.fields().len());
    assert_eq!(detectors.len(), creator.detector_entries().len());
    for (i, detector) in detectors.iter().enumerate() {
        assert_eq!(&creator.detector_entries()[i].detector, detector);
        assert_eq!(creator.aggregation(i).unwrap().id, to_standard(detector.function));
    }
}

#[test]
fn count_detector_with_fifteen_minute_buckets() {
    let mut creator = sample_creator(RecordingApi::new());
    add(&mut creator, AggregationId::Count, "bytes");
    creator.set_bucket_span("15m");

    assert_eq!(creator.bucket_span_ms(), 900_000);
    let job: JsonValue = serde_json::from_str(&creator.formatted_job_json().unwrap()).unwrap();
    assert_eq!(job["analysis_config"]["detectors"], json!([{"function": "count"}]));
    assert_eq!(job["analysis_config"]["bucket_span"], json!("15m"));
    assert_eq!(job["data_description"]["time_field"], json!("@timestamp"));
}

#[test]
fn unparsable_bucket_span_has_zero_length() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_bucket_span("2w");
    assert_eq!(creator.bucket_span(), "2w");
    assert_eq!(creator.bucket_span_ms(), 0);
}

#[test]
fn sparse_data_toggles_count() {
    let mut creator = sample_creator(RecordingApi::new());
    add(&mut creator, AggregationId::Count, "bytes");

    creator.set_sparse_data(true);
    assert_eq!(creator.detectors()[0].function, AggregationId::NonZeroCount);
    creator.set_sparse_data(false);
    assert_eq!(creator.detectors()[0].function, AggregationId::Count);
}

#[test]
fn sparse_round_trip_restores_every_function() {
    let functions = [
        AggregationId::Count,
        AggregationId::HighCount,
        AggregationId::LowCount,
        AggregationId::Sum,
        AggregationId::HighSum,
        AggregationId::LowSum,
    ];
    let mut creator = sample_creator(RecordingApi::new());
    for id in functions {
        add(&mut creator, id, "bytes");
    }

    creator.set_sparse_data(true);
    let sparse: Vec<_> = creator.detectors().iter().map(|d| d.function).collect();
    assert_eq!(
        sparse,
        vec![
            AggregationId::NonZeroCount,
            AggregationId::HighNonZeroCount,
            AggregationId::LowNonZeroCount,
            AggregationId::NonNullSum,
            AggregationId::HighNonNullSum,
            AggregationId::LowNonNullSum,
        ]
    );

    creator.set_sparse_data(false);
    let restored: Vec<_> = creator.detectors().iter().map(|d| d.function).collect();
    assert_eq!(restored, functions.to_vec());
}

#[test]
fn detectors_added_while_sparse_use_sparse_functions() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_sparse_data(true);
    add(&mut creator, AggregationId::HighSum, "bytes");
    add(&mut creator, AggregationId::Mean, "bytes");
    assert_eq!(creator.detectors()[0].function, AggregationId::HighNonNullSum);
    assert_eq!(creator.detectors()[1].function, AggregationId::Mean);
}

#[test]
fn edit_out_of_range_changes_nothing() {
    let mut creator = sample_creator(RecordingApi::new());
    add(&mut creator, AggregationId::Mean, "bytes");
    add(&mut creator, AggregationId::Max, "response_time");
    let before_job = creator.job_config().clone();
    let before_entries = creator.detector_entries().to_vec();

    let edited = creator.edit_detector(
        Detector::new(AggregationId::Min).with_field("bytes"),
        *Aggregation::lookup(AggregationId::Min),
        Field::new("bytes", FieldType::Long),
        2,
    );

    assert!(!edited);
    assert_eq!(creator.job_config(), &before_job);
    assert_eq!(creator.detector_entries(), before_entries.as_slice());
}

#[test]
fn edit_in_range_replaces_and_reapplies_sparse() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_sparse_data(true);
    add(&mut creator, AggregationId::Mean, "bytes");

    let field = creator.find_field("bytes").unwrap();
    assert!(creator.edit_detector(
        Detector::new(AggregationId::Sum).with_field("bytes"),
        *Aggregation::lookup(AggregationId::Sum),
        field,
        0,
    ));
    assert_eq!(creator.detectors()[0].function, AggregationId::NonNullSum);
    assert_eq!(creator.aggregation(0).unwrap().id, AggregationId::Sum);
}

#[derive(Debug, Clone)]
enum Op {
    Add(AggregationId),
    Remove(usize),
    Edit(usize, AggregationId),
    Sparse(bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let ids = prop::sample::select(AggregationId::ALL.to_vec());
    prop_oneof![
        ids.clone().prop_map(Op::Add),
        (0usize..6).prop_map(Op::Remove),
        ((0usize..6), ids).prop_map(|(i, id)| Op::Edit(i, id)),
        any::<bool>().prop_map(Op::Sparse),
    ]
}

proptest! {
    #[test]
    fn detector_views_stay_aligned(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut creator = sample_creator(RecordingApi::new());
        let mut expected_len = 0usize;
        for op in ops {
            match op {
                Op::Add(id) => {
                    add(&mut creator, to_standard(id), "bytes");
                    expected_len += 1;
                }
                Op::Remove(i) => {
                    creator.remove_detector(i);
                    if i < expected_len {
                        expected_len -= 1;
                    }
                }
                Op::Edit(i, id) => {
                    let id = to_standard(id);
                    let edited = creator.edit_detector(
                        Detector::new(id),
                        *Aggregation::lookup(id),
                        Field::event_rate(),
                        i,
                    );
                    prop_assert_eq!(edited, i < expected_len);
                }
                Op::Sparse(on) => creator.set_sparse_data(on),
            }
            prop_assert_eq!(creator.detectors().len(), expected_len);
            assert_aligned(&creator);
        }
    }
}

#[test]
fn remove_all_detectors_clears_job() {
    let mut creator = configured_creator(RecordingApi::new(), "web");
    creator.remove_all_detectors();
    assert!(creator.detectors().is_empty());
    assert!(creator.job_config().analysis_config.detectors.is_empty());
}

#[test]
fn dedicated_index_keeps_custom_name() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_job_id("web");
    let mut job = creator.job_config().clone();
    job.results_index_name = Some("custom-results".to_string());
    creator.override_configs(job, creator.datafeed_config().clone());

    creator.set_use_dedicated_index(true);
    assert_eq!(
        creator.job_config().results_index_name.as_deref(),
        Some("custom-results")
    );
}

#[test]
fn dedicated_index_on_fresh_job_uses_job_id() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_job_id("web");
    creator.set_use_dedicated_index(true);
    assert_eq!(creator.job_config().results_index_name.as_deref(), Some("web"));

    creator.set_job_id("web-2");
    assert_eq!(creator.job_config().results_index_name.as_deref(), Some("web-2"));

    creator.set_use_dedicated_index(false);
    assert!(creator.job_config().results_index_name.is_none());
}

#[test]
fn job_id_propagates_to_datafeed() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_job_id("web");
    assert_eq!(creator.datafeed_config().job_id, "web");
    assert_eq!(creator.datafeed_id(), "datafeed-web");
    assert!(creator.job_config().results_index_name.is_none());
}

#[test]
fn clearing_model_memory_limit_removes_analysis_limits() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_model_memory_limit(Some("1gb"));
    assert_eq!(creator.model_memory_limit(), Some("1gb"));
    creator.set_model_memory_limit(None);
    assert!(creator.job_config().analysis_limits.is_none());

    let job: JsonValue = serde_json::to_value(creator.job_config()).unwrap();
    assert!(job.get("analysis_limits").is_none());
}

#[test]
fn clearing_model_memory_limit_keeps_other_limits() {
    let mut creator = sample_creator(RecordingApi::new());
    let mut job = creator.job_config().clone();
    job.analysis_limits = Some(mlj_config::AnalysisLimits {
        model_memory_limit: Some("1gb".to_string()),
        categorization_examples_limit: Some(4),
    });
    creator.override_configs(job, creator.datafeed_config().clone());

    creator.set_model_memory_limit(None);
    let limits = creator.job_config().analysis_limits.clone().unwrap();
    assert_eq!(limits.model_memory_limit, None);
    assert_eq!(limits.categorization_examples_limit, Some(4));
}

#[test]
fn influencers_are_deduplicated() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.add_influencer("host");
    creator.add_influencer("status");
    creator.add_influencer("host");
    assert_eq!(creator.influencers(), ["host", "status"]);
    creator.remove_influencer("host");
    assert_eq!(creator.influencers(), ["status"]);
    creator.remove_all_influencers();
    assert!(creator.influencers().is_empty());
}

#[test]
fn categorization_filters_disappear_when_empty() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.add_categorization_filter("\\d+");
    creator.add_categorization_filter("\\d+");
    creator.add_categorization_filter("[a-f0-9]{32}");
    assert_eq!(creator.categorization_filters().unwrap().len(), 2);

    creator.remove_categorization_filter("\\d+");
    creator.remove_categorization_filter("[a-f0-9]{32}");
    assert!(creator.categorization_filters().is_none());
}

#[test]
fn optional_datafeed_settings_clear() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_query_delay(Some("90s"));
    creator.set_frequency(Some("150s"));
    creator.set_scroll_size(Some(500));
    creator.set_query_delay(None);
    creator.set_frequency(None);
    creator.set_scroll_size(None);

    let datafeed: JsonValue = serde_json::to_value(creator.datafeed_config()).unwrap();
    assert!(datafeed.get("query_delay").is_none());
    assert!(datafeed.get("frequency").is_none());
    assert!(datafeed.get("scroll_size").is_none());
}

#[test]
fn empty_summary_count_field_reads_as_none() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_summary_count_field_name(Some(""));
    assert_eq!(creator.summary_count_field_name(), None);
    creator.set_summary_count_field_name(Some("doc_count"));
    assert_eq!(creator.summary_count_field_name(), Some("doc_count"));
}

#[test]
fn submitted_datafeed_keeps_only_used_runtime_mappings() {
    let mut creator = configured_creator(RecordingApi::new(), "web");
    add(&mut creator, AggregationId::Max, "hour_of_day");

    let datafeed = creator.datafeed_for_submission();
    let kept: Vec<_> = datafeed.runtime_mappings.unwrap().keys().cloned().collect();
    assert_eq!(kept, vec!["hour_of_day"]);
    assert_eq!(datafeed.job_id, "web");
    assert_eq!(datafeed.datafeed_id, "datafeed-web");

    creator.set_filter_runtime_mappings_on_save(false);
    let all = creator.datafeed_for_submission().runtime_mappings.unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn unused_runtime_mappings_are_omitted() {
    let creator = configured_creator(RecordingApi::new(), "web");
    assert!(creator.runtime_mappings_for_save().is_none());
    let datafeed: JsonValue = serde_json::to_value(creator.datafeed_for_submission()).unwrap();
    assert!(datafeed.get("runtime_mappings").is_none());
}

#[test]
fn additional_fields_are_script_then_runtime_then_aggregation() {
    let mut creator = sample_creator(RecordingApi::new());
    let datafeed = DatafeedConfig::from_json(
        r#"{
        "indices": ["web-logs-*"],
        "script_fields": {"doubled": {"script": "doc['bytes'].value * 2"}},
        "runtime_mappings": {"hour_of_day": {"type": "long"}},
        "aggregations": {"buckets": {"date_histogram": {"field": "@timestamp"},
            "aggregations": {"bytes_max": {"max": {"field": "bytes"}}}}}
    }"#,
    )
    .unwrap();
    creator.override_configs(creator.job_config().clone(), datafeed);

    let names: Vec<_> = creator
        .additional_fields()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["doubled", "hour_of_day", "bytes_max"]);
}

const EXISTING_JOB: &str = r#"{
  "job_id": "web-existing",
  "analysis_config": {
    "bucket_span": "1h",
    "detectors": [
      {"function": "non_zero_count", "partition_field_name": "host"},
      {"function": "high_mean", "field_name": "response_time"},
      {"function": "max", "field_name": "mystery"}
    ],
    "influencers": ["host", "host", "status"]
  },
  "data_description": {"time_field": "@timestamp"},
  "results_index_name": "web-existing"
}"#;

#[test]
fn override_configs_infers_derived_state() {
    let mut creator = sample_creator(RecordingApi::new());
    let job = JobConfig::from_json(EXISTING_JOB).unwrap();
    let datafeed = DatafeedConfig::empty("web-logs-*");
    creator.override_configs(job, datafeed);

    assert!(creator.sparse_data());
    assert!(creator.use_dedicated_index());
    assert_eq!(creator.bucket_span_ms(), 3_600_000);
    assert_eq!(creator.groups(), &[] as &[String]);
    assert_eq!(creator.influencers(), ["host", "status"]);

    assert_eq!(creator.aggregation(0).unwrap().id, AggregationId::Count);
    assert_eq!(creator.detectors()[0].function, AggregationId::NonZeroCount);
    assert!(creator.field(0).unwrap().is_event_rate());
    assert_eq!(creator.field(1).unwrap().field_type, FieldType::Double);
    assert_eq!(creator.field(2).unwrap().field_type, FieldType::Unknown);
    assert_aligned(&creator);

    creator.set_sparse_data(false);
    assert_eq!(creator.detectors()[0].function, AggregationId::Count);
}

#[test]
fn shared_results_index_is_not_dedicated() {
    let mut creator = sample_creator(RecordingApi::new());
    creator.set_use_dedicated_index(true);
    let mut job = JobConfig::from_json(EXISTING_JOB).unwrap();
    job.results_index_name = Some("shared".to_string());
    creator.override_configs(job, DatafeedConfig::empty("web-logs-*"));
    assert!(!creator.use_dedicated_index());
}

#[tokio::test]
async fn auto_time_range_excludes_frozen_data() {
    let api = RecordingApi::new();
    api.set_time_range(1_000, 2_000);
    let mut creator = sample_creator(api.clone());

    creator.auto_set_time_range(true).await.unwrap();
    assert_eq!((creator.start(), creator.end()), (1_000, 2_000));

    let calls = api.calls();
    let ApiCall::TimeFieldRange(request) = &calls[0] else {
        panic!("unexpected call {:?}", calls[0]);
    };
    assert_eq!(request.index, "web-logs-*");
    assert_eq!(request.time_field_name, "@timestamp");
    assert_eq!(
        request.query,
        json!({"bool": {"must_not": [{"term": {"_tier": {"value": "data_frozen"}}}]}})
    );
    assert_eq!(request.runtime_mappings.as_ref().map(|m| m.len()), Some(2));
}

#[tokio::test]
async fn auto_time_range_can_include_frozen_data() {
    let api = RecordingApi::new();
    let mut creator = sample_creator(api.clone());
    creator.auto_set_time_range(false).await.unwrap();
    let calls = api.calls();
    let ApiCall::TimeFieldRange(request) = &calls[0] else {
        panic!("expected a time range call");
    };
    assert_eq!(request.query, json!({"match_all": {}}));
}

#[tokio::test]
async fn auto_time_range_default_follows_settings() {
    let api = RecordingApi::new();
    let mut creator = sample_creator(api.clone());
    creator.auto_set_time_range_default().await.unwrap();

    let mut including = JobCreator::new(
        api.clone(),
        api.clone(),
        sample_data_source(),
        None,
        json!({"match_all": {}}),
        CreatorSettings::default().with_exclude_frozen_data(false),
    );
    including.auto_set_time_range_default().await.unwrap();

    let queries: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ApiCall::TimeFieldRange(request) => Some(request.query),
            _ => None,
        })
        .collect();
    assert_eq!(
        queries,
        vec![
            json!({"bool": {"must_not": [{"term": {"_tier": {"value": "data_frozen"}}}]}}),
            json!({"match_all": {}}),
        ]
    );
}

#[test]
fn loaded_datafeed_follows_loaded_job() {
    let mut creator = sample_creator(RecordingApi::new());
    let job = JobConfig::from_json(EXISTING_JOB).unwrap();
    let mut datafeed = DatafeedConfig::empty("web-logs-*");
    datafeed.datafeed_id = "datafeed-orig".to_string();
    datafeed.job_id = "orig".to_string();

    creator.override_configs(job, datafeed);

    assert_eq!(creator.datafeed_config().job_id, "web-existing");
    assert_eq!(creator.datafeed_id(), "datafeed-web-existing");
    assert_eq!(
        creator.datafeed_for_submission().datafeed_id,
        creator.datafeed_id()
    );
}
