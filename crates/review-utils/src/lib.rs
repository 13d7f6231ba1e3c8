//! Shared utilities for market-review
//!
//! Logging setup and small helpers for reading configuration from the
//! process environment.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_parse, env_string, is_configured_key};
pub use logging::init_tracing;
