//! Tests for the tokio submission adapter

use std::sync::Arc;
use std::time::Duration;

use elastic_pool::runtime::{submit_async, submit_timeout_async};
use elastic_pool::Pool;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_async_runs_task() {
    let pool = Arc::new(Pool::new(1, 2, Duration::from_secs(3)));

    let (tx, rx) = tokio::sync::oneshot::channel();
    submit_async(&pool, move || {
        tx.send(123).unwrap();
    })
    .await
    .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("task ran in time")
        .expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_timeout_async_runs_task() {
    let pool = Arc::new(Pool::new(1, 1, Duration::from_secs(3)));

    let (tx, rx) = tokio::sync::oneshot::channel();
    submit_timeout_async(
        &pool,
        move || {
            tx.send("done").unwrap();
        },
        Duration::from_millis(100),
    )
    .await
    .unwrap();

    assert_eq!(rx.await.unwrap(), "done");
}
