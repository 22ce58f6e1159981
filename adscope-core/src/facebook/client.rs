use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FacebookConfig;
use crate::config::constants::graph_api;
use crate::facebook::insights::{Campaign, Insight};
use crate::facebook::{AdsInsightsSource, CampaignRow, FacebookError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_CAMPAIGN_PAGES: usize = 50;

/// Graph API error codes that mean "slow down"
const THROTTLING_CODES: &[i64] = &[4, 17, 32, 613, 80004];

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

/// Which campaigns are worth fetching insights for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignSelection {
    LeadForm,
    Traffic,
    Conversion,
    Other,
}

impl CampaignSelection {
    pub fn classify(campaign_name: &str) -> Self {
        let name = campaign_name.to_lowercase();
        if name.contains("lead form") {
            Self::LeadForm
        } else if name.contains("trafico") || name.contains("tráfico") {
            Self::Traffic
        } else if name.contains("conversion") {
            Self::Conversion
        } else {
            Self::Other
        }
    }
}

/// Facebook Marketing API client
pub struct GraphApiClient {
    http_client: HttpClient,
    access_token: String,
    api_root: String,
}

impl GraphApiClient {
    pub fn new(config: &FacebookConfig) -> Result<Self, FacebookError> {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FacebookError::Network(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(config, http_client)
    }

    pub fn with_client(
        config: &FacebookConfig,
        http_client: HttpClient,
    ) -> Result<Self, FacebookError> {
        if config.access_token.trim().is_empty() {
            return Err(FacebookError::Configuration(
                "FACEBOOK_ACCESS_TOKEN is not configured".to_string(),
            ));
        }
        Ok(Self {
            http_client,
            access_token: config.access_token.clone(),
            api_root: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.graph_api_version
            ),
        })
    }

    /// All campaigns of an account, following paging cursors
    pub async fn list_campaigns(
        &self,
        ad_account_id: &str,
    ) -> Result<Vec<Campaign>, FacebookError> {
        let account = normalize_account_id(ad_account_id);
        let url = format!("{}/{account}/campaigns", self.api_root);
        let fields = graph_api::CAMPAIGN_FIELDS.join(",");
        let limit = graph_api::PAGE_LIMIT.to_string();

        let mut page: Page<Campaign> = self
            .get_json(
                &url,
                &[("fields", fields.as_str()), ("limit", limit.as_str())],
            )
            .await?;
        let mut campaigns = std::mem::take(&mut page.data);

        let mut pages = 1;
        while let Some(next) = page.paging.and_then(|paging| paging.next) {
            if pages >= MAX_CAMPAIGN_PAGES {
                debug!(account = %account, "stopping campaign pagination at page limit");
                break;
            }
            // Cursor URLs already carry every query parameter.
            page = self.get_json(&next, &[]).await?;
            campaigns.append(&mut page.data);
            pages += 1;
        }

        Ok(campaigns)
    }

    /// Campaign-level insight for a date range; `None` when Facebook has no data
    pub async fn campaign_insight(
        &self,
        campaign_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Insight>, FacebookError> {
        let url = format!("{}/{campaign_id}/insights", self.api_root);
        let fields = graph_api::INSIGHT_FIELDS.join(",");
        let time_range = time_range_param(start, end);

        let page: Page<Insight> = self
            .get_json(
                &url,
                &[
                    ("fields", fields.as_str()),
                    ("time_range", time_range.as_str()),
                    ("level", "campaign"),
                ],
            )
            .await?;
        Ok(page.data.into_iter().next())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FacebookError> {
        let mut request = self.http_client.get(url).query(query);
        if !url.contains("access_token=") {
            request = request.query(&[("access_token", self.access_token.as_str())]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FacebookError::Network(redact_token(&e.to_string(), &self.access_token)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FacebookError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            FacebookError::InvalidResponse(format!("{e} in response from {}", strip_query(url)))
        })
    }
}

#[async_trait]
impl AdsInsightsSource for GraphApiClient {
    async fn campaign_rows(
        &self,
        ad_account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CampaignRow>, FacebookError> {
        info!(account = ad_account_id, %start, %end, "fetching campaign data");
        let campaigns = self.list_campaigns(ad_account_id).await?;

        let mut rows = Vec::new();
        for campaign in &campaigns {
            match CampaignSelection::classify(&campaign.name) {
                CampaignSelection::LeadForm => {}
                CampaignSelection::Traffic => {
                    debug!(campaign = %campaign.name, "skipping traffic campaign");
                    continue;
                }
                CampaignSelection::Conversion => {
                    debug!(campaign = %campaign.name, "skipping conversion campaign");
                    continue;
                }
                CampaignSelection::Other => {
                    debug!(campaign = %campaign.name, "skipping campaign that is not a lead form");
                    continue;
                }
            }

            if let Some(insight) = self.campaign_insight(&campaign.id, start, end).await? {
                rows.push(CampaignRow::from_insight(campaign, &insight, start, end));
            }
        }

        info!(
            account = ad_account_id,
            campaigns = campaigns.len(),
            rows = rows.len(),
            "campaign data processed"
        );
        Ok(rows)
    }
}

/// Graph API account ids carry an `act_` prefix
pub fn normalize_account_id(ad_account_id: &str) -> String {
    let trimmed = ad_account_id.trim();
    if trimmed.starts_with("act_") {
        trimmed.to_string()
    } else {
        format!("act_{trimmed}")
    }
}

fn time_range_param(start: NaiveDate, end: NaiveDate) -> String {
    json!({
        "since": start.format("%Y-%m-%d").to_string(),
        "until": end.format("%Y-%m-%d").to_string(),
    })
    .to_string()
}

fn classify_error(status: StatusCode, body: &str) -> FacebookError {
    let error = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").cloned());
    let message = error
        .as_ref()
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();
    let code = error
        .as_ref()
        .and_then(|e| e.get("code"))
        .and_then(Value::as_i64);

    if status == StatusCode::TOO_MANY_REQUESTS
        || code.is_some_and(|c| THROTTLING_CODES.contains(&c))
    {
        return FacebookError::RateLimited(message);
    }
    if status == StatusCode::UNAUTHORIZED || code == Some(190) {
        return FacebookError::Authentication(message);
    }
    FacebookError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn redact_token(message: &str, token: &str) -> String {
    if token.is_empty() {
        message.to_string()
    } else {
        message.replace(token, "<redacted>")
    }
}
