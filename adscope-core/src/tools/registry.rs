use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::ToolDefinition;
use crate::tools::{Tool, ToolError};

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tool_registrations: Vec<Arc<dyn Tool>>,
    tool_lookup: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.tool_lookup.contains_key(tool.name()) {
            return Err(ToolError::AlreadyRegistered(tool.name().to_string()));
        }

        let index = self.tool_registrations.len();
        self.tool_lookup.insert(tool.name(), index);
        self.tool_registrations.push(tool);
        Ok(())
    }

    pub fn available_tools(&self) -> Vec<String> {
        self.tool_registrations
            .iter()
            .map(|tool| tool.name().to_string())
            .collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tool_lookup.contains_key(name)
    }

    /// Function declarations in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registrations
            .iter()
            .map(|tool| tool.definition())
            .collect()
    }

    pub async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .tool_lookup
            .get(name)
            .and_then(|index| self.tool_registrations.get(*index))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.validate_args(&args)?;
        debug!(tool = name, "executing tool");
        let result = tool.execute(args).await;
        if let Err(error) = &result {
            warn!(tool = name, %error, "tool execution failed");
        }
        result
    }
}
