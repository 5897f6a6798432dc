//! Agent tools backed by [`CodeInterpreter`](crate::CodeInterpreter)

pub mod download_file;
pub mod run_python;

pub use download_file::DownloadFileTool;
pub use run_python::RunPythonCodeTool;

use agent_tools::ToolDefinition;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Definitions of the interpreter tools, sorted by name
///
/// Available without a client, for listing what a registry would expose.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            DownloadFileTool::NAME,
            DownloadFileTool::DESCRIPTION,
            DownloadFileTool::parameters_schema(),
        ),
        ToolDefinition::new(
            RunPythonCodeTool::NAME,
            RunPythonCodeTool::DESCRIPTION,
            RunPythonCodeTool::parameters_schema(),
        ),
    ]
}

/// Deserialize tool parameters, reporting failures against the tool name
fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> agent_core::Result<T> {
    serde_json::from_value(params).map_err(|e| agent_core::Error::InvalidParameters {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}
