//! Tool that runs Python code in the sandbox

use agent_core::Result as AgentResult;
use agent_tools::{Tool, schema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::interpreter::CodeInterpreter;

/// Runs Python code in an isolated remote sandbox
pub struct RunPythonCodeTool {
    interpreter: Arc<CodeInterpreter>,
}

#[derive(Debug, Deserialize)]
struct RunParams {
    code: String,
}

impl RunPythonCodeTool {
    /// Tool name advertised to the model
    pub const NAME: &'static str = "run_python_code";

    /// Tool description advertised to the model
    pub const DESCRIPTION: &'static str = "Run Python code in an isolated sandbox environment. \
         Returns the captured STDOUT and STDERR, or an error message. \
         Files the code writes can be fetched afterwards with download_file_from_sandbox.";

    /// JSON schema of the tool parameters
    pub fn parameters_schema() -> Value {
        schema::object(
            json!({ "code": schema::string("Python code to execute") }),
            &["code"],
        )
    }

    /// Create the tool over a shared interpreter
    pub fn new(interpreter: Arc<CodeInterpreter>) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl Tool for RunPythonCodeTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: RunParams = super::parse_params(Self::NAME, params)?;
        let output = self.interpreter.run_python_code(&params.code).await;
        Ok(Value::String(output))
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
