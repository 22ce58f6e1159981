//! Facebook Ads insights
//!
//! [`AdsInsightsSource`] is the seam between the tools and the Marketing API:
//! [`GraphApiClient`] talks to the Graph API, [`FixtureInsightsSource`] serves
//! canned rows.

pub mod client;
pub mod fixture;
pub mod insights;
pub mod row;

use async_trait::async_trait;
use chrono::NaiveDate;

pub use client::{CampaignSelection, GraphApiClient, normalize_account_id};
pub use fixture::FixtureInsightsSource;
pub use insights::{ParsedResults, parse_results, target_indicator};
pub use row::CampaignRow;

#[derive(Debug, thiserror::Error)]
pub enum FacebookError {
    #[error("Facebook API is not configured: {0}")]
    Configuration(String),
    #[error("Facebook authentication failed: {0}")]
    Authentication(String),
    #[error("Facebook API rate limit reached: {0}")]
    RateLimited(String),
    #[error("Facebook API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("Network error talking to Facebook: {0}")]
    Network(String),
    #[error("Unexpected Facebook API response: {0}")]
    InvalidResponse(String),
}

/// Source of per-campaign performance rows for an account and period
#[async_trait]
pub trait AdsInsightsSource: Send + Sync {
    /// Lead-form campaign rows for `start..=end`
    async fn campaign_rows(
        &self,
        ad_account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CampaignRow>, FacebookError>;
}
