//! Tool trait definition

use crate::ToolDefinition;
use agent_core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools that agents can execute
///
/// Tools are functions that LLM agents can call to interact with the world.
/// Each tool provides a name, a description and a JSON schema for its input.
/// Tools that report back to the model in prose return a `Value::String`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    ///
    /// `params` should match [`Tool::input_schema`]. An `Err` means the call
    /// itself was malformed; failures of the underlying action are reported
    /// inside the returned value so the model can react to them.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name within a [`ToolRegistry`](crate::ToolRegistry)
    fn name(&self) -> &str;

    /// Description that tells the LLM when to use this tool
    fn description(&self) -> &str;

    /// Input schema (JSON Schema format)
    fn input_schema(&self) -> Value;

    /// Definition to advertise to an LLM provider
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}
