//! Environment variable helpers
//!
//! Configuration structs take a lookup function instead of reading
//! `std::env` directly so they can be tested without mutating the process
//! environment.

use std::str::FromStr;

/// Read an environment variable, treating empty or whitespace-only values as unset
pub fn env_var(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

/// Parse a value produced by `lookup`
///
/// Returns `Ok(None)` when the variable is unset, and `Err` with a readable
/// message when it is set but does not parse.
pub fn parse_env_var<T, F>(lookup: F, name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(name)) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{name}={raw:?} is invalid: {e}")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
