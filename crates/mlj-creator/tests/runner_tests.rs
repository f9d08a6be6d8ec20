//! Job runner tests
//!
//! Progress publication, start failures and poll cancellation.

use std::sync::Arc;

use mlj_creator::{
    ApiError, CreatorError, DatafeedState, JobLifecycle, LookbackProgress, SubmissionStage,
    PROGRESS_COMPLETE, PROGRESS_ERROR,
};
use mlj_test_utils::{configured_creator, RecordingApi};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

fn running(progress: f64) -> Result<LookbackProgress, ApiError> {
    Ok(LookbackProgress {
        progress,
        is_running: true,
        is_job_closed: false,
    })
}

fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(i32) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |p| sink.lock().push(p))
}

#[tokio::test]
async fn progress_is_published_until_lookback_finishes() {
    let api = RecordingApi::new();
    api.push_progress(running(30.0));
    api.push_progress(running(60.0));
    let mut creator = configured_creator(api.clone(), "web");
    let (seen, subscriber) = recorder();
    creator.subscribe_to_progress(subscriber);

    let mut runner = creator.create_and_start_job().await.unwrap();
    let rx = runner.subscribe();
    runner.wait().await;

    assert_eq!(*seen.lock(), vec![0, 30, 60, PROGRESS_COMPLETE]);
    assert_eq!(*rx.borrow(), PROGRESS_COMPLETE);
    assert_eq!(runner.percentage_complete(), PROGRESS_COMPLETE);
    assert_eq!(runner.datafeed_state(), DatafeedState::Stopped);
    assert!(runner.job_assigned_to_node());
    assert_eq!(api.count("get_lookback_progress"), 3);
}

#[tokio::test]
async fn progress_past_the_end_is_capped() {
    let api = RecordingApi::new();
    api.push_progress(Ok(LookbackProgress {
        progress: 103.7,
        is_running: false,
        is_job_closed: true,
    }));
    let mut creator = configured_creator(api, "web");
    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;
    assert_eq!(runner.percentage_complete(), PROGRESS_COMPLETE);
}

#[tokio::test]
async fn polling_continues_while_job_is_open() {
    let api = RecordingApi::new();
    api.push_progress(Ok(LookbackProgress {
        progress: 100.0,
        is_running: false,
        is_job_closed: false,
    }));
    let mut creator = configured_creator(api.clone(), "web");
    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;
    assert_eq!(api.count("get_lookback_progress"), 2);
}

#[tokio::test]
async fn open_failure_publishes_error_progress() {
    let api = RecordingApi::new();
    api.fail("open_job", ApiError::validation(429, "too many open jobs"));
    let mut creator = configured_creator(api.clone(), "web");
    let (seen, subscriber) = recorder();
    creator.subscribe_to_progress(subscriber);

    let err = creator.create_and_start_job().await.unwrap_err();

    assert!(matches!(err, CreatorError::DatafeedStart(ApiError::Validation { status: 429, .. })));
    assert_eq!(*seen.lock(), vec![PROGRESS_ERROR]);
    assert_eq!(api.count("start_datafeed"), 0);
    assert!(creator.orphaned_job());
    assert!(matches!(
        creator.lifecycle(),
        JobLifecycle::Failed {
            stage: SubmissionStage::StartDatafeed,
            ..
        }
    ));
}

#[tokio::test]
async fn unassigned_job_is_reported() {
    let api = RecordingApi::new();
    api.set_node(None);
    let mut creator = configured_creator(api, "web");
    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;
    assert!(!runner.job_assigned_to_node());
}

#[tokio::test]
async fn progress_read_failure_stops_polling() {
    let api = RecordingApi::new();
    api.push_progress(running(10.0));
    api.push_progress(Err(ApiError::Transport("gone".to_string())));
    let mut creator = configured_creator(api.clone(), "web");
    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;

    assert_eq!(runner.percentage_complete(), PROGRESS_ERROR);
    assert_eq!(runner.datafeed_state(), DatafeedState::Stopped);
    assert_eq!(api.count("get_lookback_progress"), 2);
}

#[tokio::test]
async fn force_stop_ends_polling() {
    let api = RecordingApi::new();
    for _ in 0..50 {
        api.push_progress(running(1.0));
    }
    let mut creator = configured_creator(api.clone(), "web");
    creator.force_stop_refresh_polls();

    let mut runner = creator.create_and_start_job().await.unwrap();
    runner.wait().await;

    assert_eq!(runner.percentage_complete(), 0);
    assert_eq!(runner.datafeed_state(), DatafeedState::Started);
    assert_eq!(api.count("get_lookback_progress"), 0);
}
