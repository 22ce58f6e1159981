//! Marketing analysis agent
//!
//! [`MarketingAgent`] ties the model, the two ads tools, the system prompt and
//! the session memory together, and drives a bounded tool-calling loop for
//! every user message.

mod executor;
mod prompt;

pub use executor::{AgentContext, MarketingAgent, build_tool_registry, render_prompt};
pub use prompt::{generate_session_id, load_prompt_from_file, load_system_prompt};

use crate::llm::LLMError;
use crate::storage::StoreError;
use crate::tools::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}
