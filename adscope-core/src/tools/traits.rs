use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolDefinition;
use crate::tools::ToolError;

/// Core trait for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<String, ToolError>;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> Value;

    /// Validate arguments before execution
    fn validate_args(&self, args: &Value) -> Result<(), ToolError> {
        if args.is_object() {
            Ok(())
        } else {
            Err(ToolError::invalid_arguments(
                self.name(),
                "arguments must be a JSON object",
            ))
        }
    }

    /// Function declaration sent to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name().to_string(),
            self.description().to_string(),
            self.parameters(),
        )
    }
}
