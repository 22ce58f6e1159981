use crate::config::constants::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agent loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Sampling temperature for the tool-calling model
    #[serde(default = "default_agent_temperature")]
    pub temperature: f32,

    /// Upper bound on completion tokens per model call
    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: u32,

    /// Maximum number of model calls spent on tool use before a final answer is forced
    #[serde(default = "default_agent_max_iterations")]
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            temperature: default_agent_temperature(),
            max_tokens: default_agent_max_tokens(),
            max_iterations: default_agent_max_iterations(),
        }
    }
}

fn default_agent_temperature() -> f32 {
    defaults::AGENT_TEMPERATURE
}
fn default_agent_max_tokens() -> u32 {
    defaults::AGENT_MAX_TOKENS
}
fn default_agent_max_iterations() -> usize {
    defaults::AGENT_MAX_ITERATIONS
}

/// Conversation memory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Temperature used for the summarization call
    #[serde(default = "default_memory_temperature")]
    pub temperature: f32,

    /// Token budget for buffered messages before older ones are folded into the summary
    #[serde(default = "default_memory_max_token_limit")]
    pub max_token_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            temperature: default_memory_temperature(),
            max_token_limit: default_memory_max_token_limit(),
        }
    }
}

fn default_memory_temperature() -> f32 {
    defaults::MEMORY_TEMPERATURE
}
fn default_memory_max_token_limit() -> usize {
    defaults::MEMORY_MAX_TOKEN_LIMIT
}

/// Where the agent's system prompt is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    Database,
    File,
}

impl PromptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptSource::Database => "database",
            PromptSource::File => "file",
        }
    }
}

impl fmt::Display for PromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "database" | "db" => Ok(PromptSource::Database),
            // "default" is the historical name for the bundled prompt file
            "file" | "default" => Ok(PromptSource::File),
            other => Err(format!("unknown prompt source '{other}'")),
        }
    }
}

/// System prompt configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_source")]
    pub source: PromptSource,

    /// Prompt file used when the source is `file` or the database has no active prompt
    #[serde(default = "default_prompt_file")]
    pub default_prompt_file: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            source: default_prompt_source(),
            default_prompt_file: default_prompt_file(),
        }
    }
}

fn default_prompt_source() -> PromptSource {
    defaults::SYSTEM_PROMPT_SOURCE
        .parse()
        .unwrap_or(PromptSource::Database)
}
fn default_prompt_file() -> String {
    defaults::DEFAULT_PROMPT_FILE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_source_accepts_legacy_default_name() {
        assert_eq!("default".parse::<PromptSource>(), Ok(PromptSource::File));
        assert_eq!(" Database ".parse::<PromptSource>(), Ok(PromptSource::Database));
        assert!("redis".parse::<PromptSource>().is_err());
    }

    #[test]
    fn agent_defaults_match_documented_values() {
        let agent = AgentConfig::default();
        assert_eq!(agent.max_iterations, 5);
        assert_eq!(agent.max_tokens, 2000);
        assert!((agent.temperature - 0.7).abs() < f32::EPSILON);

        let memory = MemoryConfig::default();
        assert_eq!(memory.max_token_limit, 2000);
    }
}
