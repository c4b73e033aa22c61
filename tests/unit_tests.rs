//! Unit-level tests for configuration, errors, builders and adapters.

mod unit;
