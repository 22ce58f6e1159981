//! Tools the agent can call
//!
//! Two tools are exposed to the model: [`ListAvailableClientsTool`] and
//! [`FacebookAdsAnalysisTool`]. Both return plain text that is fed back to the
//! model as the tool message. [`ToolRegistry`] holds them by name and turns them
//! into function declarations.

mod ads_analysis;
mod filter;
mod list_clients;
mod periods;
mod registry;
mod traits;

pub use ads_analysis::FacebookAdsAnalysisTool;
pub use filter::{CampaignType, filter_campaigns};
pub use list_clients::ListAvailableClientsTool;
pub use periods::{ReportingPeriod, last_two_months};
pub use registry::ToolRegistry;
pub use traits::Tool;

use crate::facebook::FacebookError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Facebook(#[from] FacebookError),
}

impl ToolError {
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}
