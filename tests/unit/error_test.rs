//! Tests for error types

use elastic_pool::PoolError;

#[test]
fn test_invalid_task_error() {
    assert_eq!(PoolError::InvalidTask.to_string(), "invalid task");
}

#[test]
fn test_submit_timeout_error() {
    assert_eq!(PoolError::SubmitTimeout.to_string(), "submission timed out");
}

#[test]
fn test_disconnected_error() {
    assert_eq!(PoolError::Disconnected.to_string(), "task queue disconnected");
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("thread_stack_size must be greater than 0".to_string());
    assert_eq!(
        err.to_string(),
        "invalid configuration: thread_stack_size must be greater than 0"
    );
}

#[test]
fn test_errors_convert_to_anyhow() {
    let err: anyhow::Error = PoolError::NoWork.into();
    assert_eq!(format!("{err}"), "no work available");
}
