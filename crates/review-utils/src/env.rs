//! Environment variable helpers

use std::str::FromStr;
use thiserror::Error;

/// Error raised when an environment variable holds an unparsable value
#[derive(Debug, Error)]
#[error("Invalid value for {name}: '{value}'")]
pub struct EnvError {
    pub name: String,
    pub value: String,
}

/// Read a non-blank environment variable, trimmed
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable
///
/// Unset or blank variables yield `Ok(None)`.
pub fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, EnvError> {
    match env_string(name) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| EnvError {
            name: name.to_string(),
            value,
        }),
    }
}

/// Whether an API key looks like a real credential
///
/// Template placeholders such as `your_api_key_here` and short junk values
/// are treated as unset.
pub fn is_configured_key(key: Option<&str>) -> bool {
    match key.map(str::trim) {
        Some(k) => !k.is_empty() && !k.starts_with("your_") && k.len() > 10,
        None => false,
    }
}
