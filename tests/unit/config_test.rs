//! Tests for configuration parsing and normalization

use std::time::Duration;

use elastic_pool::config::{EvictionPolicy, PoolConfig, MIN_IDLE_TIMEOUT};

#[test]
fn test_defaults() {
    let cfg = PoolConfig::new();
    assert_eq!(cfg.min_workers, None);
    assert_eq!(cfg.idle_timeout, MIN_IDLE_TIMEOUT);
    assert_eq!(cfg.eviction, EvictionPolicy::Approximate);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_builder_methods() {
    let cfg = PoolConfig::new()
        .with_min_workers(2)
        .with_max_workers(6)
        .with_idle_timeout(Duration::from_secs(10))
        .with_eviction(EvictionPolicy::Strict)
        .with_thread_stack_size(1 << 20);
    assert_eq!(cfg.min_workers, Some(2));
    assert_eq!(cfg.max_workers, 6);
    assert_eq!(cfg.idle_timeout, Duration::from_secs(10));
    assert_eq!(cfg.eviction, EvictionPolicy::Strict);
    assert_eq!(cfg.thread_stack_size, Some(1 << 20));
}

#[test]
fn test_normalized_is_idempotent() {
    let once = PoolConfig::from_bounds(3, 1, Duration::from_millis(5)).normalized();
    let twice = once.clone().normalized();
    assert_eq!(once, twice);
}

#[test]
fn test_invalid_stack_size() {
    assert!(PoolConfig::new().with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_from_json() {
    let json = r#"{
        "min_workers": 2,
        "max_workers": 4,
        "idle_timeout_ms": 5000,
        "eviction": "strict"
    }"#;

    let cfg = PoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.min_workers, Some(2));
    assert_eq!(cfg.max_workers, 4);
    assert_eq!(cfg.idle_timeout, Duration::from_secs(5));
    assert_eq!(cfg.eviction, EvictionPolicy::Strict);
    assert_eq!(cfg.thread_stack_size, None);
}

#[test]
fn test_from_json_partial_uses_defaults() {
    let cfg = PoolConfig::from_json_str(r#"{ "max_workers": 8 }"#).unwrap();
    assert_eq!(cfg.min_workers, None);
    assert_eq!(cfg.max_workers, 8);
    assert_eq!(cfg.idle_timeout, MIN_IDLE_TIMEOUT);
}

#[test]
fn test_from_json_rejects_bad_input() {
    assert!(PoolConfig::from_json_str("not json").is_err());
    assert!(PoolConfig::from_json_str(r#"{ "thread_stack_size": 0 }"#).is_err());
    assert!(PoolConfig::from_json_str(r#"{ "eviction": "sometimes" }"#).is_err());
}

#[test]
fn test_json_round_trip_keeps_milliseconds() {
    let cfg = PoolConfig::new().with_idle_timeout(Duration::from_millis(3250));
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"idle_timeout_ms\":3250"));
}

#[test]
fn test_eviction_policy_from_str() {
    assert_eq!("approximate".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Approximate));
    assert_eq!(" STRICT ".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Strict));
    assert!("eager".parse::<EvictionPolicy>().is_err());
}

#[test]
fn test_from_lookup_empty_is_default() {
    let cfg = PoolConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, PoolConfig::default());
}
