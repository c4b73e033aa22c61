//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use elastic_pool::builders::PoolBuilder;
use elastic_pool::config::PoolConfig;
use elastic_pool::{PoolError, TaskFailure};

#[test]
fn test_pool_builder_keeps_config() {
    let config = PoolConfig::new().with_min_workers(1).with_max_workers(3);
    let builder = PoolBuilder::new(config.clone());
    assert_eq!(builder.config(), &config);
}

#[test]
fn test_pool_builder_normalizes() {
    let pool = PoolBuilder::new(
        PoolConfig::new()
            .with_min_workers(5)
            .with_max_workers(2)
            .with_idle_timeout(Duration::from_millis(100)),
    )
    .build()
    .unwrap();
    assert_eq!(pool.min_workers(), 5);
    assert_eq!(pool.max_workers(), 5);
    assert_eq!(pool.idle_timeout(), Duration::from_secs(3));
    assert_eq!(pool.live_workers(), 0);
}

#[test]
fn test_pool_builder_rejects_invalid() {
    let result = PoolBuilder::new(PoolConfig::new().with_thread_stack_size(0)).build();
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}

#[test]
fn test_pool_builder_accepts_closure_handler() {
    let (tx, rx) = std::sync::mpsc::channel::<TaskFailure>();
    let tx = parking_lot::Mutex::new(tx);
    let handler = move |failure: TaskFailure| {
        let _ = tx.lock().send(failure);
    };

    let pool = PoolBuilder::new(PoolConfig::new().with_min_workers(1).with_max_workers(1))
        .with_failure_handler(Arc::new(handler))
        .build()
        .unwrap();
    pool.submit(|| panic!("handled")).unwrap();

    let failure = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(failure.message, "handled");
}
