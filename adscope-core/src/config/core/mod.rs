pub mod agent;
pub mod providers;
pub mod runtime;

pub use agent::{AgentConfig, MemoryConfig, PromptConfig, PromptSource};
pub use providers::{AzureOpenAIConfig, FacebookConfig};
pub use runtime::{CacheConfig, DatabaseConfig, LoggingConfig, ServerConfig};
