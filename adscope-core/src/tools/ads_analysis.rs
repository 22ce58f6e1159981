use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{AdsCache, InsightsQuery};
use crate::clock::Clock;
use crate::config::constants::{campaign_types, tools};
use crate::facebook::{AdsInsightsSource, CampaignRow, normalize_account_id};
use crate::tools::{
    CampaignType, ReportingPeriod, Tool, ToolError, filter_campaigns, last_two_months,
};

/// Summarizes an account's campaigns over the last two calendar months,
/// consulting the insights cache before the Marketing API.
pub struct FacebookAdsAnalysisTool {
    source: Arc<dyn AdsInsightsSource>,
    cache: AdsCache,
    clock: Arc<dyn Clock>,
}

impl FacebookAdsAnalysisTool {
    pub fn new(source: Arc<dyn AdsInsightsSource>, cache: AdsCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache,
            clock,
        }
    }

    async fn rows_for_period(
        &self,
        ad_account_id: &str,
        campaign_type: CampaignType,
        period: ReportingPeriod,
    ) -> Result<Vec<CampaignRow>, ToolError> {
        let query =
            InsightsQuery::new(ad_account_id, campaign_type.as_str(), period.start, period.end);
        if let Some(rows) = self.cache.get(&query) {
            return Ok(rows);
        }

        info!(account = ad_account_id, period = %period, "fetching fresh data from Facebook API");
        let rows = self
            .source
            .campaign_rows(ad_account_id, period.start, period.end)
            .await?;
        let rows = filter_campaigns(rows, campaign_type);

        if let Err(error) = self.cache.put(&query, &rows) {
            warn!(%error, account = ad_account_id, "failed to cache campaign data");
        }
        Ok(rows)
    }
}

fn summarize_period(
    response: &mut String,
    label: &str,
    period: ReportingPeriod,
    rows: &[CampaignRow],
) {
    let spend: f64 = rows.iter().map(|row| row.spend).sum();
    let results: i64 = rows.iter().map(|row| row.results).sum();
    let _ = writeln!(response, "{label} ({} to {}):", period.start, period.end);
    let _ = writeln!(response, "- {} campaigns found", rows.len());
    let _ = writeln!(response, "- Total spend: ${spend:.2} CLP");
    let _ = writeln!(response, "- Total results: {results}\n");
}

#[async_trait]
impl Tool for FacebookAdsAnalysisTool {
    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let ad_account_id = args
            .get("ad_account_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(normalize_account_id)
            .ok_or_else(|| ToolError::invalid_arguments(self.name(), "ad_account_id is required"))?;
        let campaign_type = args
            .get("campaign_type")
            .and_then(Value::as_str)
            .unwrap_or(campaign_types::LEAD_FORM)
            .parse::<CampaignType>()
            .map_err(|message| ToolError::invalid_arguments(self.name(), message))?;

        let (last_month, previous_month) = last_two_months(self.clock.today());
        info!(
            account = %ad_account_id,
            %campaign_type,
            last_month = %last_month,
            previous_month = %previous_month,
            "analyzing campaigns"
        );

        let last_rows = self
            .rows_for_period(&ad_account_id, campaign_type, last_month)
            .await?;
        let previous_rows = self
            .rows_for_period(&ad_account_id, campaign_type, previous_month)
            .await?;

        if last_rows.is_empty() && previous_rows.is_empty() {
            return Ok(format!(
                "No {campaign_type} campaign data found for account {ad_account_id} in the last two months."
            ));
        }

        let mut response =
            format!("Facebook Ads Analysis for {ad_account_id} ({campaign_type} campaigns):\n\n");
        if !last_rows.is_empty() {
            summarize_period(&mut response, "Last Month", last_month, &last_rows);
        }
        if !previous_rows.is_empty() {
            summarize_period(&mut response, "Previous Month", previous_month, &previous_rows);
        }
        response.push_str(
            "Data is ready for detailed analysis. The agent can now provide insights and recommendations.",
        );

        info!(account = %ad_account_id, %campaign_type, "analysis completed");
        Ok(response)
    }

    fn name(&self) -> &'static str {
        tools::FACEBOOK_ADS_ANALYSIS
    }

    fn description(&self) -> &'static str {
        "Analyze Facebook advertising campaign data for a specific account. Returns performance data for the last two months with caching for efficiency."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ad_account_id": {
                    "type": "string",
                    "description": "Facebook Ad Account ID (e.g., act_123456)"
                },
                "campaign_type": {
                    "type": "string",
                    "enum": [
                        campaign_types::LEAD_FORM,
                        campaign_types::TRAFFIC,
                        campaign_types::CONVERSION
                    ],
                    "default": campaign_types::LEAD_FORM,
                    "description": "Type of campaigns to analyze"
                }
            },
            "required": ["ad_account_id"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::facebook::FixtureInsightsSource;
    use crate::storage::Store;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn row(name: &str, spend: f64, results: i64) -> CampaignRow {
        serde_json::from_value(json!({
            "ID Campaña": "1",
            "Inicio del informe": "2024-04-01",
            "Fin del informe": "2024-04-30",
            "Nombre de la campaña": name,
            "Importe gastado (CLP)": spend,
            "Resultados": results
        }))
        .unwrap()
    }

    fn tool() -> (FacebookAdsAnalysisTool, Arc<FixtureInsightsSource>) {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap()));
        let source = Arc::new(FixtureInsightsSource::new());
        let cache = AdsCache::new(store, clock.clone(), 1);
        (FacebookAdsAnalysisTool::new(source.clone(), cache, clock), source)
    }

    #[tokio::test]
    async fn summarizes_both_months_and_caches_them() {
        let (tool, source) = tool();
        source.insert(
            "act_1",
            date(4, 1),
            date(4, 30),
            vec![
                row("Lead Form A", 1000.5, 3),
                row("Lead Form B", 500.0, 2),
                row("Branding", 99.0, 1),
            ],
        );
        source.insert("act_1", date(3, 1), date(3, 31), vec![row("Lead Form A", 250.0, 1)]);

        let output = tool.execute(json!({"ad_account_id": "act_1"})).await.unwrap();
        assert!(output.starts_with("Facebook Ads Analysis for act_1 (lead_form campaigns):\n\n"));
        assert!(output.contains(
            "Last Month (2024-04-01 to 2024-04-30):\n- 2 campaigns found\n\
             - Total spend: $1500.50 CLP\n- Total results: 5\n"
        ));
        assert!(output.contains(
            "Previous Month (2024-03-01 to 2024-03-31):\n- 1 campaigns found\n\
             - Total spend: $250.00 CLP"
        ));
        assert!(output.ends_with("The agent can now provide insights and recommendations."));
        assert_eq!(source.call_count(), 2);

        tool.execute(json!({"ad_account_id": "act_1"})).await.unwrap();
        assert_eq!(source.call_count(), 2, "second run is served from the cache");
    }

    #[tokio::test]
    async fn reports_missing_data() {
        let (tool, source) = tool();
        let output = tool
            .execute(json!({"ad_account_id": "1", "campaign_type": "traffic"}))
            .await
            .unwrap();
        assert_eq!(
            output,
            "No traffic campaign data found for account act_1 in the last two months."
        );
        assert_eq!(source.calls()[0].0, "act_1");
    }

    #[tokio::test]
    async fn rejects_unknown_campaign_type_and_propagates_source_errors() {
        let (tool, source) = tool();
        assert!(matches!(
            tool.execute(json!({"ad_account_id": "act_1", "campaign_type": "video"})).await,
            Err(ToolError::InvalidArguments { .. })
        ));

        source.fail_account("act_9", "boom");
        assert!(matches!(
            tool.execute(json!({"ad_account_id": "act_9"})).await,
            Err(ToolError::Facebook(_))
        ));
    }
}
