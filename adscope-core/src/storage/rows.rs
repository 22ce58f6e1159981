//! Row types returned by the store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string; never the clear-text password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacebookAccount {
    pub id: i64,
    pub ad_account_id: String,
    pub account_name: Option<String>,
    pub key_vault_secret_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFacebookAccount {
    pub ad_account_id: String,
    pub account_name: Option<String>,
    pub key_vault_secret_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAssignment {
    pub id: i64,
    pub user_id: i64,
    pub facebook_account_id: i64,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<i64>,
    pub is_active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: i64,
    pub ad_account_id: String,
    pub date_period: String,
    pub query_hash: String,
    pub result_json: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub session_id: String,
    pub user_id: i64,
    pub user_prompt: String,
    pub full_prompt_sent: String,
    pub llm_response: String,
    pub llm_params: Option<Value>,
    pub tokens_used: Option<i64>,
    pub estimated_cost_usd: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConversationTurn {
    pub session_id: String,
    pub user_id: i64,
    pub user_prompt: String,
    pub full_prompt_sent: String,
    pub llm_response: String,
    pub llm_params: Option<Value>,
    pub tokens_used: Option<i64>,
    pub estimated_cost_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: i64,
    pub prompt_name: String,
    pub version: String,
    pub prompt_text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub id: i64,
    pub model_name: String,
    pub input_cost_per_1k_tokens: f64,
    pub output_cost_per_1k_tokens: f64,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModelPricing {
    pub model_name: String,
    pub input_cost_per_1k_tokens: f64,
    pub output_cost_per_1k_tokens: f64,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: i64,
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub analysis_type: String,
    pub facebook_account_id: Option<i64>,
    pub result_text: String,
    pub analysis_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnalysisResult {
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub analysis_type: String,
    pub facebook_account_id: Option<i64>,
    pub result_text: String,
    pub analysis_metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPerformance {
    pub id: i64,
    pub ad_account_id: String,
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub date: NaiveDate,
    pub metrics: Value,
    pub facebook_account_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCampaignPerformance {
    pub ad_account_id: String,
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub date: NaiveDate,
    pub metrics: Value,
    pub facebook_account_id: Option<i64>,
}
