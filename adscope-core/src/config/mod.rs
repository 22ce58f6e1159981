//! Adscope configuration
//!
//! Settings are read from `adscope.toml`, then overridden by environment
//! variables (optionally loaded from `.env`). Every field has a default so an
//! empty or missing file is a valid configuration.

pub mod constants;
pub mod core;
pub mod env;
pub mod loader;

pub use core::{
    AgentConfig, AzureOpenAIConfig, CacheConfig, DatabaseConfig, FacebookConfig, LoggingConfig,
    MemoryConfig, PromptConfig, PromptSource, ServerConfig,
};
pub use env::load_dotenv;
pub use loader::{AdscopeConfig, ConfigManager};
