//! Tool that downloads files produced by sandboxed code

use agent_core::Result as AgentResult;
use agent_tools::{Tool, schema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::interpreter::CodeInterpreter;

/// Downloads a file from the sandbox, registering images as artifacts
pub struct DownloadFileTool {
    interpreter: Arc<CodeInterpreter>,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    sandbox_path: String,
    #[serde(default)]
    execution_id: Option<String>,
}

impl DownloadFileTool {
    /// Tool name advertised to the model
    pub const NAME: &'static str = "download_file_from_sandbox";

    /// Tool description advertised to the model
    pub const DESCRIPTION: &'static str = "Download a file written by previously executed code. \
         Images (.png, .jpg, .jpeg, .gif) are attached to the conversation as artifacts. \
         Defaults to the most recent execution.";

    /// JSON schema of the tool parameters
    pub fn parameters_schema() -> Value {
        schema::object(
            json!({
                "sandbox_path": schema::string("Path of the file inside the sandbox, e.g. output.png"),
                "execution_id": schema::string("Execution that produced the file; defaults to the latest"),
            }),
            &["sandbox_path"],
        )
    }

    /// Create the tool over a shared interpreter
    pub fn new(interpreter: Arc<CodeInterpreter>) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl Tool for DownloadFileTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: DownloadParams = super::parse_params(Self::NAME, params)?;
        let message = match params.execution_id {
            Some(id) => {
                self.interpreter
                    .download_file_from_execution(&id, &params.sandbox_path)
                    .await
            }
            None => {
                self.interpreter
                    .download_file_from_sandbox(&params.sandbox_path)
                    .await
            }
        };
        Ok(Value::String(message))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        Self::parameters_schema()
    }
}
