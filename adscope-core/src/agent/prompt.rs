use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::Path;
use tracing::{info, warn};

use crate::config::constants::prompts;
use crate::config::{PromptConfig, PromptSource};
use crate::storage::Store;

/// System prompt from the configured source.
///
/// The database source falls back to the prompt file when no version is
/// active. An unreadable or empty file falls back to the built-in prompt.
pub fn load_system_prompt(store: &Store, config: &PromptConfig) -> String {
    match config.source {
        PromptSource::Database => load_prompt_from_database(store, config),
        PromptSource::File => load_prompt_from_file(&config.default_prompt_file),
    }
}

fn load_prompt_from_database(store: &Store, config: &PromptConfig) -> String {
    match store.active_prompt(prompts::SYSTEM_PROMPT_NAME) {
        Ok(Some(prompt)) => {
            info!(
                name = %prompt.prompt_name,
                version = %prompt.version,
                "loaded system prompt from database"
            );
            prompt.prompt_text
        }
        Ok(None) => {
            warn!("no active prompt found in database, using file fallback");
            load_prompt_from_file(&config.default_prompt_file)
        }
        Err(error) => {
            warn!(%error, "failed to load prompt from database, using file fallback");
            load_prompt_from_file(&config.default_prompt_file)
        }
    }
}

pub fn load_prompt_from_file(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => {
            let prompt = contents.trim().to_string();
            info!(path = %path.display(), chars = prompt.len(), "loaded system prompt from file");
            prompt
        }
        Ok(_) => {
            warn!(path = %path.display(), "prompt file is empty, using built-in prompt");
            prompts::FALLBACK_SYSTEM_PROMPT.to_string()
        }
        Err(error) => {
            warn!(
                %error,
                path = %path.display(),
                "failed to read prompt file, using built-in prompt"
            );
            prompts::FALLBACK_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Readable session id: `YYYYmmdd_HHMMSS_{user}` with the user made file-name safe
pub fn generate_session_id<Tz>(user: &str, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let clean_user = user.replace('@', "_at_").replace('.', "_");
    format!("{}_{clean_user}", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        store
    }

    fn config(source: PromptSource, file: &str) -> PromptConfig {
        PromptConfig {
            source,
            default_prompt_file: file.to_string(),
        }
    }

    #[test]
    fn session_ids_are_timestamped_and_sanitized() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 14, 7, 9).unwrap();
        assert_eq!(
            generate_session_id("ana.perez@example.com", now),
            "20240503_140709_ana_perez_at_example_com"
        );
        assert_eq!(generate_session_id("7", now), "20240503_140709_7");
    }

    #[test]
    fn database_prompt_wins_when_active() {
        let store = store();
        store
            .create_prompt_version(prompts::SYSTEM_PROMPT_NAME, "v1", "Prompt v1", true)
            .unwrap();
        let prompt = load_system_prompt(&store, &config(PromptSource::Database, "missing.txt"));
        assert_eq!(prompt, "Prompt v1");
    }

    #[test]
    fn falls_back_to_file_then_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  Prompt from file  \n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let store = store();
        assert_eq!(
            load_system_prompt(&store, &config(PromptSource::Database, &path)),
            "Prompt from file"
        );
        assert_eq!(
            load_system_prompt(&store, &config(PromptSource::File, "/nonexistent/prompt.txt")),
            prompts::FALLBACK_SYSTEM_PROMPT
        );

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            load_prompt_from_file(empty.path()),
            prompts::FALLBACK_SYSTEM_PROMPT
        );
    }
}
