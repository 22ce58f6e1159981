//! Graph API payload shapes and result-indicator resolution

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::config::constants::indicators;

/// Campaign object from `/{ad_account_id}/campaigns`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Campaign {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub effective_status: Option<String>,
    #[serde(default)]
    pub stop_time: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<String>,
    #[serde(default)]
    pub lifetime_budget: Option<String>,
}

/// One `{action_type, value}` entry of `actions` or `cost_per_action_type`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ActionStat {
    pub action_type: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
}

/// Campaign-level insight record. The Graph API sends numbers as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Insight {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reach: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub frequency: f64,
    #[serde(default)]
    pub actions: Vec<ActionStat>,
    #[serde(default)]
    pub cost_per_action_type: Vec<ActionStat>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpm: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub inline_link_clicks: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost_per_inline_link_click: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub inline_link_click_ctr: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpc: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ctr: f64,
}

impl Insight {
    pub fn action_count(&self, action_type: &str) -> Option<i64> {
        self.actions
            .iter()
            .find(|action| action.action_type == action_type)
            .map(|action| action.value as i64)
    }

    pub fn cost_for(&self, action_type: &str) -> Option<f64> {
        self.cost_per_action_type
            .iter()
            .find(|cost| cost.action_type == action_type)
            .map(|cost| cost.value)
    }
}

/// Accepts `"12.5"`, `12.5` or `null`; anything unparsable becomes 0
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// The main result of a campaign and how it was identified
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResults {
    pub count: i64,
    /// Indicator chosen from the campaign name, or `fallback:<action>`
    pub indicator: String,
    /// API action name that actually matched
    pub real_indicator: String,
    pub cost_per_result: f64,
}

impl ParsedResults {
    fn not_available() -> Self {
        Self {
            count: 0,
            indicator: indicators::NOT_AVAILABLE.to_string(),
            real_indicator: indicators::NOT_AVAILABLE.to_string(),
            cost_per_result: 0.0,
        }
    }
}

/// Indicator implied by the campaign name
pub fn target_indicator(campaign_name: &str) -> &'static str {
    let name = campaign_name.to_lowercase();
    if name.contains("conversion") {
        indicators::CONVERSION
    } else if name.contains("lead form") {
        indicators::LEAD_FORM
    } else if name.contains("tráfico") || name.contains("trafico") {
        indicators::LINK_CLICK
    } else {
        indicators::CONVERSION
    }
}

/// Resolve the number of results, the indicator and the cost per result
pub fn parse_results(campaign_name: &str, insight: Option<&Insight>) -> ParsedResults {
    let Some(insight) = insight.filter(|insight| !insight.actions.is_empty()) else {
        return ParsedResults::not_available();
    };

    let indicator = target_indicator(campaign_name);
    for api_name in indicators::action_candidates(indicator) {
        if let Some(count) = insight.action_count(api_name) {
            return ParsedResults {
                count,
                indicator: indicator.to_string(),
                real_indicator: (*api_name).to_string(),
                cost_per_result: insight.cost_for(api_name).unwrap_or(0.0),
            };
        }
    }

    warn!(campaign = campaign_name, "no primary action found, using the most expensive action");
    let fallback = insight
        .cost_per_action_type
        .iter()
        .max_by(|a, b| a.value.total_cmp(&b.value));

    match fallback {
        Some(cost) => ParsedResults {
            count: insight.action_count(&cost.action_type).unwrap_or(0),
            indicator: format!("{}{}", indicators::FALLBACK_PREFIX, cost.action_type),
            real_indicator: cost.action_type.clone(),
            cost_per_result: cost.value,
        },
        None => ParsedResults::not_available(),
    }
}
