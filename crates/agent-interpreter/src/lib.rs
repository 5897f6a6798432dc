//! Remote sandboxed code execution for agent-rs
//!
//! This crate lets an LLM agent run Python in a remote sandbox and retrieve
//! what the code produced:
//!
//! - [`SandboxClient`] talks to the sandbox service over authenticated HTTP
//! - [`Sandbox`] is one remote environment, created once and reused
//! - [`Execution`] is one code submission; its stdout/stderr arrive over a
//!   server-sent-events stream consumed by a background task it owns
//! - [`CodeInterpreter`] is the façade agents use, exposed as the
//!   `run_python_code` and `download_file_from_sandbox` tools
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_interpreter::CodeInterpreter;
//! use agent_tools::ToolRegistry;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let interpreter = Arc::new(CodeInterpreter::from_env()?);
//! let registry = ToolRegistry::new();
//! interpreter.register_tools(&registry);
//!
//! let output = registry
//!     .execute("run_python_code", json!({ "code": "print('hi')" }))
//!     .await?;
//! println!("{}", output.as_str().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod files;
pub mod interpreter;
mod listener;
pub mod sandbox;
pub mod sse;
pub mod tools;

pub use client::SandboxClient;
pub use config::{InterpreterConfig, InterpreterConfigBuilder};
pub use error::{Result, SandboxError};
pub use execution::{Execution, ExecutionLogs, ExecutionStatus, LogStream};
pub use interpreter::{CodeInterpreter, NO_EXECUTION_MESSAGE, NO_OUTPUT_MESSAGE, format_output};
pub use sandbox::Sandbox;
pub use tools::{DownloadFileTool, RunPythonCodeTool};
