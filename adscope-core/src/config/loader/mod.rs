use crate::config::constants::defaults;
use crate::config::core::{
    AgentConfig, AzureOpenAIConfig, CacheConfig, DatabaseConfig, FacebookConfig, LoggingConfig,
    MemoryConfig, PromptConfig, ServerConfig,
};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure for adscope
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AdscopeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub azure_openai: AzureOpenAIConfig,

    #[serde(default)]
    pub facebook: FacebookConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

impl AdscopeConfig {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored so that a blank line in `.env` does not wipe a
    /// value from the config file.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("FACEBOOK_APP_ID") {
            self.facebook.app_id = value;
        }
        if let Some(value) = get("FACEBOOK_APP_SECRET") {
            self.facebook.app_secret = value;
        }
        if let Some(value) = get("FACEBOOK_ACCESS_TOKEN") {
            self.facebook.access_token = value;
        }
        if let Some(value) = get("FACEBOOK_AD_ACCOUNT_ID") {
            self.facebook.default_ad_account_id = Some(value);
        }

        if let Some(value) = get("AZURE_OPENAI_ENDPOINT") {
            self.azure_openai.endpoint = value;
        }
        if let Some(value) = get("AZURE_OPENAI_API_KEY") {
            self.azure_openai.api_key = value;
        }
        if let Some(value) = get("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.azure_openai.deployment = value;
        }
        if let Some(value) = get("AZURE_OPENAI_API_VERSION") {
            self.azure_openai.api_version = value;
        }

        if let Some(value) = get("DATABASE_PATH") {
            self.database.path = value;
        }
        if let Some(value) = get("BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = get("MAX_LIVE_SESSIONS") {
            self.server.max_live_sessions = parse_var("MAX_LIVE_SESSIONS", &value)?;
        }
        if let Some(value) = get("LOG_LEVEL") {
            self.logging.level = value.to_lowercase();
        }
        if let Some(value) = get("LOG_FILE") {
            self.logging.file = value;
        }

        if let Some(value) = get("MEMORY_TEMPERATURE") {
            self.memory.temperature = parse_var("MEMORY_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("MEMORY_MAX_TOKEN_LIMIT") {
            self.memory.max_token_limit = parse_var("MEMORY_MAX_TOKEN_LIMIT", &value)?;
        }
        if let Some(value) = get("AGENT_TEMPERATURE") {
            self.agent.temperature = parse_var("AGENT_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("AGENT_MAX_TOKENS") {
            self.agent.max_tokens = parse_var("AGENT_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("AGENT_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_var("AGENT_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = get("CACHE_EXPIRATION_HOURS") {
            self.cache.expiration_hours = parse_var("CACHE_EXPIRATION_HOURS", &value)?;
        }

        if let Some(value) = get("SYSTEM_PROMPT_SOURCE") {
            self.prompt.source = value
                .parse()
                .map_err(|err: String| anyhow!("SYSTEM_PROMPT_SOURCE: {err}"))?;
        }
        if let Some(value) = get("DEFAULT_PROMPT_FILE") {
            self.prompt.default_prompt_file = value;
        }

        Ok(())
    }

    /// Check the values that would otherwise fail deep inside a request
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(anyhow!("agent.max_iterations must be at least 1"));
        }
        if self.server.max_live_sessions == 0 {
            return Err(anyhow!("server.max_live_sessions must be at least 1"));
        }
        if self.memory.max_token_limit == 0 {
            return Err(anyhow!("memory.max_token_limit must be at least 1"));
        }
        if !(0..=defaults::MAX_CACHE_EXPIRATION_HOURS).contains(&self.cache.expiration_hours) {
            return Err(anyhow!(
                "cache.expiration_hours must be between 0 and {}, got {}",
                defaults::MAX_CACHE_EXPIRATION_HOURS,
                self.cache.expiration_hours
            ));
        }
        for (name, value) in [
            ("agent.temperature", self.agent.temperature),
            ("memory.temperature", self.memory.temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(anyhow!("{name} must be between 0.0 and 2.0, got {value}"));
            }
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid value '{value}' for {key}: {err}"))
}

/// Configuration manager for loading and validating configurations
#[derive(Clone)]
pub struct ConfigManager {
    config: AdscopeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the current directory, then apply the environment
    pub fn load() -> Result<Self> {
        Self::load_from_workspace(std::env::current_dir()?)
    }

    /// Load `adscope.toml` from a workspace directory, or defaults when it is absent
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let config_path = workspace.as_ref().join(defaults::CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::load_from_file(&config_path);
        }

        let mut config = AdscopeConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: AdscopeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env_overrides()?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &AdscopeConfig {
        &self.config
    }

    /// Consume the manager and return the configuration
    pub fn into_config(self) -> AdscopeConfig {
        self.config
    }

    /// Get the configuration file path (if loaded from file)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::core::PromptSource;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_yields_documented_defaults() {
        let config: AdscopeConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8000");
        assert_eq!(config.azure_openai.api_version, "2024-12-01-preview");
        assert_eq!(config.facebook.graph_api_version, "v19.0");
        assert_eq!(config.cache.expiration_hours, 1);
        assert_eq!(config.prompt.source, PromptSource::Database);
        assert_eq!(
            config.prompt.default_prompt_file,
            "prompts/default_system_prompt.txt"
        );
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config: AdscopeConfig = toml::from_str(
            r#"
            [agent]
            max_iterations = 3

            [database]
            path = "from-file.db"
            "#,
        )
        .unwrap();

        config
            .apply_overrides_from(lookup_from(&[
                ("AGENT_MAX_ITERATIONS", "8"),
                ("DATABASE_PATH", "from-env.db"),
                ("SYSTEM_PROMPT_SOURCE", "default"),
                ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
                ("FACEBOOK_ACCESS_TOKEN", ""),
            ]))
            .unwrap();

        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.database.path, "from-env.db");
        assert_eq!(config.prompt.source, PromptSource::File);
        assert_eq!(config.azure_openai.deployment, "gpt-4o");
        assert!(config.facebook.access_token.is_empty());
    }

    #[test]
    fn malformed_numeric_override_is_reported() {
        let mut config = AdscopeConfig::default();
        let err = config
            .apply_overrides_from(lookup_from(&[("MEMORY_MAX_TOKEN_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("MEMORY_MAX_TOKEN_LIMIT"));
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let mut config = AdscopeConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_cache_expiration() {
        let mut config = AdscopeConfig::default();
        config
            .apply_overrides_from(lookup_from(&[("CACHE_EXPIRATION_HOURS", "10000000000")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.expiration_hours"));

        config.cache.expiration_hours = -1;
        assert!(config.validate().is_err());

        config.cache.expiration_hours = defaults::MAX_CACHE_EXPIRATION_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_live_sessions() {
        let mut config = AdscopeConfig::default();
        config.server.max_live_sessions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_config_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nexpiration_hours = 6").unwrap();

        let manager = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(manager.config_path(), Some(file.path()));
        // The environment may override this, but never outside the valid range.
        assert!(manager.config().cache.expiration_hours >= 0);
    }
}
