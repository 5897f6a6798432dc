//! Shared utilities for agent-rs
//!
//! This crate provides common functionality used across the agent-rs workspace:
//! tracing setup and helpers for reading configuration from the environment.

pub mod env;
pub mod logging;

pub use env::{env_var, parse_env_var};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
