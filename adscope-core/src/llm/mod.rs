//! # LLM integration
//!
//! A single chat-completions abstraction ([`LLMProvider`]) with one network
//! backend, Azure OpenAI, and a scripted backend that replays canned responses
//! for offline runs and tests.

pub mod provider;
pub mod providers;

pub use provider::{
    FinishReason, LLMError, LLMProvider, LLMRequest, LLMResponse, Message, MessageRole, ToolCall,
    ToolChoice, ToolDefinition, Usage,
};
pub use providers::{AzureOpenAIProvider, ScriptedProvider};
