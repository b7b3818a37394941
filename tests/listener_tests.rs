//! Tests for lifecycle listener dispatch, filtering, and weak registration.

mod test_harness;

use std::sync::Arc;
use std::time::Duration;

use overseer::listener::{
    FilteredJobLifecycleListener, JobLifecycleListener, LoggingJobLifecycleListener,
};
use overseer::spec::JobSpecFilter;

use test_harness::{assert_eventually, failing_spec, running_instance, test_spec, RecordingListener};

/// A filter that does not match a spec's URI never invokes the delegate for
/// that spec's events.
#[tokio::test]
async fn test_filtered_listener_skips_non_matching_uri() {
    let launcher = running_instance("filter-mismatch").await;
    let instance = launcher.driver();

    let recording = RecordingListener::new();
    let listener: Arc<dyn JobLifecycleListener> = Arc::new(FilteredJobLifecycleListener::new(
        JobSpecFilter::eq_job_spec_uri("overseer:job/wanted"),
        recording.clone(),
    ));
    instance.register_weak_job_lifecycle_listener(&listener);

    let matching = instance
        .job_launcher()
        .launch_job(test_spec("overseer:job/wanted"))
        .unwrap();
    matching.start_async().unwrap();
    let other = instance
        .job_launcher()
        .launch_job(test_spec("overseer:job/other"))
        .unwrap();
    other.start_async().unwrap();

    matching.await_result(Duration::from_secs(5)).await.unwrap();
    other.await_result(Duration::from_secs(5)).await.unwrap();

    assert_eventually(
        || async { !recording.completions.lock().unwrap().is_empty() },
        Duration::from_secs(2),
        "matching completion observed",
    )
    .await;

    assert_eq!(recording.launched_uris(), ["overseer:job/wanted"]);
    let completions = recording.completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].0, "overseer:job/wanted");
}

/// Version-qualified filters reject a matching URI with the wrong version.
#[tokio::test]
async fn test_filtered_listener_version_mismatch() {
    let launcher = running_instance("filter-version").await;
    let instance = launcher.driver();

    let recording = RecordingListener::new();
    let listener: Arc<dyn JobLifecycleListener> = Arc::new(FilteredJobLifecycleListener::new(
        JobSpecFilter::eq_job_spec_uri_version("overseer:job/v", "2"),
        recording.clone(),
    ));
    instance.register_weak_job_lifecycle_listener(&listener);

    let driver = instance
        .job_launcher()
        .launch_job(test_spec("overseer:job/v")) // version "1"
        .unwrap();
    driver.start_async().unwrap();
    driver.await_result(Duration::from_secs(5)).await.unwrap();

    assert!(recording.launches.lock().unwrap().is_empty());
}

/// Registration is weak: a listener dropped by its owner stops receiving
/// events, and dispatch silently skips the dead entry.
#[tokio::test]
async fn test_dropped_listener_is_silently_skipped() {
    let launcher = running_instance("weak-drop").await;
    let instance = launcher.driver();

    let recording = RecordingListener::new();
    let listener: Arc<dyn JobLifecycleListener> = recording.clone();
    instance.register_weak_job_lifecycle_listener(&listener);

    // Drop every strong reference the test holds.
    let launches = Arc::downgrade(&recording);
    drop(listener);
    drop(recording);
    assert!(launches.upgrade().is_none());

    let driver = instance
        .job_launcher()
        .launch_job(test_spec("overseer:job/unobserved"))
        .unwrap();
    driver.start_async().unwrap();
    let result = driver.await_result(Duration::from_secs(5)).await.unwrap();
    assert!(result.is_successful());
}

/// Completion callbacks observe the failed result of a failing run.
#[tokio::test]
async fn test_completion_callback_sees_failed_result() {
    let launcher = running_instance("completion-failure").await;
    let instance = launcher.driver();

    let recording = RecordingListener::new();
    let listener: Arc<dyn JobLifecycleListener> = recording.clone();
    instance.register_weak_job_lifecycle_listener(&listener);

    let driver = instance
        .job_launcher()
        .launch_job(failing_spec("overseer:job/doomed"))
        .unwrap();
    driver.start_async().unwrap();
    driver.await_result(Duration::from_secs(5)).await.unwrap();

    assert_eventually(
        || async { !recording.completions.lock().unwrap().is_empty() },
        Duration::from_secs(2),
        "completion observed",
    )
    .await;
    let completions = recording.completions.lock().unwrap();
    assert_eq!(completions[0].0, "overseer:job/doomed");
    assert!(!completions[0].1.is_successful());
}

/// Multiple registered listeners each receive a given event exactly once.
#[tokio::test]
async fn test_each_listener_notified_exactly_once() {
    let launcher = running_instance("multi-listener").await;
    let instance = launcher.driver();

    let first = RecordingListener::new();
    let second = RecordingListener::new();
    let logging: Arc<dyn JobLifecycleListener> = Arc::new(LoggingJobLifecycleListener);
    let first_dyn: Arc<dyn JobLifecycleListener> = first.clone();
    let second_dyn: Arc<dyn JobLifecycleListener> = second.clone();
    instance.register_weak_job_lifecycle_listener(&first_dyn);
    instance.register_weak_job_lifecycle_listener(&second_dyn);
    instance.register_weak_job_lifecycle_listener(&logging);

    let driver = instance
        .job_launcher()
        .launch_job(test_spec("overseer:job/fanout"))
        .unwrap();
    driver.start_async().unwrap();
    driver.await_result(Duration::from_secs(5)).await.unwrap();

    assert_eq!(first.launched_uris(), ["overseer:job/fanout"]);
    assert_eq!(second.launched_uris(), ["overseer:job/fanout"]);
}

/// Scheduler admissions are observable through listener callbacks.
#[tokio::test]
async fn test_scheduled_and_cancelled_callbacks() {
    let launcher = running_instance("sched-callbacks").await;
    let instance = launcher.driver();

    let recording = RecordingListener::new();
    let listener: Arc<dyn JobLifecycleListener> = recording.clone();
    instance.register_weak_job_lifecycle_listener(&listener);

    let spec = test_spec("overseer:job/watched");
    let runnable = instance.create_job_runnable(spec.clone());
    instance
        .job_scheduler()
        .schedule_recurring(&spec, Duration::from_secs(60), runnable)
        .unwrap();
    assert_eq!(
        recording.scheduled.lock().unwrap().as_slice(),
        ["overseer:job/watched"]
    );

    instance.job_scheduler().cancel("overseer:job/watched");
    assert_eq!(
        recording.cancelled.lock().unwrap().as_slice(),
        ["overseer:job/watched"]
    );
}
