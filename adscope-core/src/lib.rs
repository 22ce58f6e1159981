//! # adscope core
//!
//! Conversational analysis of Facebook Ads campaign performance.
//!
//! ## Architecture
//!
//! - **Agent**: a bounded tool-calling loop over an OpenAI-compatible model
//! - **Tools**: account listing and a two-month campaign analysis
//! - **Memory**: chat turns persisted per session, with a rolling summary
//! - **Caching**: Marketing API results keyed by account, month and request hash
//! - **Storage**: SQLite tables for users, accounts, cache, history, prompts,
//!   pricing and analysis results

pub mod agent;
pub mod analysis;
pub mod cache;
pub mod clock;
pub mod config;
pub mod facebook;
pub mod llm;
pub mod memory;
pub mod pricing;
pub mod storage;
pub mod tools;

pub use agent::{AgentContext, AgentError, MarketingAgent};
pub use cache::{AdsCache, InsightsQuery};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AdscopeConfig, ConfigManager};
pub use facebook::{AdsInsightsSource, CampaignRow, FixtureInsightsSource, GraphApiClient};
pub use llm::{AzureOpenAIProvider, LLMProvider, ScriptedProvider};
pub use memory::{ConversationMemory, SessionInfo};
pub use storage::{Store, StoreError};
