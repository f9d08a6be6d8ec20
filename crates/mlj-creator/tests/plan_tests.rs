//! Wizard plan file tests

use std::io::Write;

use mlj_catalog::AggregationId;
use mlj_creator::{CreatorSettings, JobType, PlanError, WizardPlan};
use mlj_test_utils::RecordingApi;
use pretty_assertions::assert_eq;
use serde_json::json;

const RARE_PLAN: &str = r#"
data_source:
  title: auth-logs-*
  name: Auth
  time_field: "@timestamp"
  fields:
    - { name: user, type: keyword }
    - { name: source_ip, type: ip }
  runtime_fields:
    user_domain: { type: keyword, script: "emit(doc['user'].value.splitOnToken('@')[1])" }
    login_hour: { type: long, script: "emit(doc['@timestamp'].value.getHour())" }
job_type: rare
job_id: auth-rare-domains
description: Rare login domains
groups: [security]
bucket_span: 1h
detectors:
  - { function: rare, by: user_domain }
influencers: [user_domain]
dedicated_index: true
model_plot: true
calendars: [holidays]
"#;

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn yaml_plan_submits_filtered_datafeed() {
    let file = write_temp(".yaml", RARE_PLAN);
    let plan = WizardPlan::load(file.path()).unwrap();
    assert_eq!(plan.job_type, JobType::Rare);

    let api = RecordingApi::new();
    let mut creator = plan
        .build(api.clone(), api.clone(), CreatorSettings::default())
        .unwrap();
    assert_eq!(creator.job_config().results_index_name.as_deref(), Some("auth-rare-domains"));
    assert!(creator.model_plot());
    assert_eq!(creator.detectors()[0].function, AggregationId::Rare);
    assert!(creator.field(0).unwrap().is_event_rate());

    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;

    let datafeed = &api.submitted_datafeeds()[0];
    let kept: Vec<_> = datafeed
        .runtime_mappings
        .as_ref()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(kept, vec!["user_domain"]);
    assert_eq!(api.count("assign_new_job_id"), 1);
}

#[test]
fn json_plan_is_read_as_json() {
    let plan = json!({
        "data_source": {"title": "metrics-*", "time_field": "timestamp",
            "fields": [{"name": "cpu", "type": "double"}]},
        "job_id": "cpu",
        "bucket_span": "5m",
        "detectors": [{"function": "high_mean", "field": "cpu"}],
        "model_memory_limit": "16mb"
    });
    let file = write_temp(".json", &plan.to_string());
    let plan = WizardPlan::load(file.path()).unwrap();

    let api = RecordingApi::new();
    let creator = plan.build(api.clone(), api, CreatorSettings::default()).unwrap();
    assert_eq!(creator.bucket_span_ms(), 300_000);
    assert_eq!(creator.time_field_name(), "timestamp");
    assert_eq!(creator.field(0).unwrap().id, "cpu");
    assert_eq!(creator.model_memory_limit(), Some("16mb"));
    assert_eq!(creator.job_type(), JobType::Advanced);
}

#[test]
fn missing_plan_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = WizardPlan::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, PlanError::Io(_)));
}

#[test]
fn malformed_plan_is_rejected() {
    let file = write_temp(".yaml", "job_id: [not, a, string]\n");
    assert!(matches!(WizardPlan::load(file.path()), Err(PlanError::Yaml(_))));
}
