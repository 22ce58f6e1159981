use crate::config::constants::{azure, graph_api};
use serde::{Deserialize, Serialize};

/// Azure OpenAI deployment settings
#[derive(Clone, Deserialize, Serialize, Default)]
pub struct AzureOpenAIConfig {
    /// Base endpoint, without the `/openai/deployments/` path
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl AzureOpenAIConfig {
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.deployment.trim().is_empty()
    }

    /// Full chat completions URL for the configured deployment
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

// The key never reaches logs through Debug.
impl std::fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

fn default_api_version() -> String {
    azure::API_VERSION.to_string()
}

/// Facebook Marketing API credentials
#[derive(Clone, Deserialize, Serialize)]
pub struct FacebookConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_secret: String,

    #[serde(default)]
    pub access_token: String,

    /// Account used by the one-shot report when none is given on the command line
    #[serde(default)]
    pub default_ad_account_id: Option<String>,

    #[serde(default = "default_graph_version")]
    pub graph_api_version: String,

    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            access_token: String::new(),
            default_ad_account_id: None,
            graph_api_version: default_graph_version(),
            base_url: default_graph_base_url(),
        }
    }
}

impl std::fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &redact(&self.app_secret))
            .field("access_token", &redact(&self.access_token))
            .field("default_ad_account_id", &self.default_ad_account_id)
            .field("graph_api_version", &self.graph_api_version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_graph_version() -> String {
    graph_api::VERSION.to_string()
}
fn default_graph_base_url() -> String {
    graph_api::BASE_URL.to_string()
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}
