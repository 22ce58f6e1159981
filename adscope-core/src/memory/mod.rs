//! Database-backed conversation memory with a rolling summary
//!
//! Each chat turn is persisted as one `conversation_history` row. In memory the
//! session keeps the recent user and assistant messages plus a moving summary.
//! Once the buffered messages exceed the token limit, the oldest ones are
//! folded into the summary through one model call.

use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::config::constants::prompts;
use crate::llm::{LLMProvider, LLMRequest, Message, MessageRole};
use crate::pricing::estimate_tokens_from_text;
use crate::storage::{ConversationTurn, NewConversationTurn, Store, StoreResult};

/// One exchange to persist, with the bookkeeping recorded beside it
#[derive(Debug, Clone, Default)]
pub struct MemoryTurn {
    pub user_prompt: String,
    pub full_prompt_sent: String,
    pub llm_response: String,
    pub llm_params: Option<Value>,
    pub tokens_used: Option<i64>,
    pub estimated_cost_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub user_id: i64,
    pub session_id: String,
    pub message_count: usize,
    pub has_summary: bool,
}

pub struct ConversationMemory {
    user_id: i64,
    session_id: String,
    messages: Vec<Message>,
    moving_summary: String,
    store: Store,
    summarizer: Arc<dyn LLMProvider>,
    config: MemoryConfig,
}

impl ConversationMemory {
    /// Rebuild the session from stored turns. Load failures leave the history empty.
    pub fn load(
        store: Store,
        summarizer: Arc<dyn LLMProvider>,
        config: MemoryConfig,
        user_id: i64,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let mut messages = Vec::new();
        match store.list_turns(user_id, &session_id) {
            Ok(turns) => {
                for turn in &turns {
                    if !turn.user_prompt.is_empty() {
                        messages.push(Message::user(turn.user_prompt.clone()));
                    }
                    if !turn.llm_response.is_empty() {
                        messages.push(Message::assistant(turn.llm_response.clone()));
                    }
                }
                if turns.is_empty() {
                    info!(user_id, session = %session_id, "no previous conversation history found");
                } else {
                    info!(
                        user_id,
                        session = %session_id,
                        turns = turns.len(),
                        "loaded conversation history"
                    );
                }
            }
            Err(error) => {
                warn!(
                    %error,
                    user_id,
                    session = %session_id,
                    "failed to load conversation history"
                );
            }
        }

        Self {
            user_id,
            session_id,
            messages,
            moving_summary: String::new(),
            store,
            summarizer,
            config,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn moving_summary(&self) -> &str {
        &self.moving_summary
    }

    /// Record the exchange in memory and in the database, then prune the buffer.
    ///
    /// The in-memory buffer is updated even when the insert fails.
    pub async fn save_turn(&mut self, turn: MemoryTurn) -> StoreResult<ConversationTurn> {
        self.messages.push(Message::user(turn.user_prompt.clone()));
        self.messages.push(Message::assistant(turn.llm_response.clone()));

        let stored = self.store.insert_turn(&NewConversationTurn {
            session_id: self.session_id.clone(),
            user_id: self.user_id,
            user_prompt: turn.user_prompt,
            full_prompt_sent: turn.full_prompt_sent,
            llm_response: turn.llm_response,
            llm_params: turn.llm_params,
            tokens_used: turn.tokens_used,
            estimated_cost_usd: turn.estimated_cost_usd,
        });

        self.prune().await;

        let stored = stored?;
        debug!(session = %self.session_id, id = stored.id, "saved conversation turn");
        Ok(stored)
    }

    /// Estimated tokens held by the message buffer
    pub fn buffer_tokens(&self) -> u64 {
        self.messages
            .iter()
            .map(|message| estimate_tokens_from_text(&message.content))
            .sum()
    }

    async fn prune(&mut self) {
        let limit = self.config.max_token_limit as u64;
        let mut buffer_tokens = self.buffer_tokens();
        if buffer_tokens <= limit {
            return;
        }

        let mut pruned = Vec::new();
        while buffer_tokens > limit && !self.messages.is_empty() {
            let message = self.messages.remove(0);
            buffer_tokens -= estimate_tokens_from_text(&message.content);
            pruned.push(message);
        }

        match self.summarize(&pruned).await {
            Ok(summary) => {
                info!(
                    session = %self.session_id,
                    folded = pruned.len(),
                    "folded old messages into conversation summary"
                );
                self.moving_summary = summary;
            }
            Err(error) => {
                warn!(
                    %error,
                    session = %self.session_id,
                    dropped = pruned.len(),
                    "summarization failed; dropping old messages and keeping previous summary"
                );
            }
        }
    }

    async fn summarize(&self, pruned: &[Message]) -> Result<String, crate::llm::LLMError> {
        let mut new_lines = String::new();
        for message in pruned {
            let speaker = match message.role {
                MessageRole::User => "Human",
                _ => "AI",
            };
            let _ = writeln!(new_lines, "{speaker}: {}", message.content);
        }
        let prompt = format!(
            "Current summary:\n{}\n\nNew lines of conversation:\n{}\nNew summary:",
            self.moving_summary,
            new_lines.trim_end()
        );

        let request = LLMRequest::new(self.summarizer.model(), vec![Message::user(prompt)])
            .with_system_prompt(prompts::SUMMARY_SYSTEM_PROMPT)
            .with_temperature(self.config.temperature);
        let response = self.summarizer.generate(request).await?;
        Ok(response
            .content
            .map(|summary| summary.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .unwrap_or_else(|| self.moving_summary.clone()))
    }

    /// Summary (as a system message) followed by the buffered messages
    pub fn context_messages(&self) -> Vec<Message> {
        let mut context = Vec::with_capacity(self.messages.len() + 1);
        if !self.moving_summary.is_empty() {
            context.push(Message::system(self.moving_summary.clone()));
        }
        context.extend(self.messages.iter().cloned());
        context
    }

    pub fn recent_messages(&self, count: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    pub fn conversation_summary(&self) -> String {
        if self.moving_summary.is_empty() {
            prompts::NO_SUMMARY_YET.to_string()
        } else {
            self.moving_summary.clone()
        }
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            user_id: self.user_id,
            session_id: self.session_id.clone(),
            message_count: self.messages.len(),
            has_summary: !self.moving_summary.is_empty(),
        }
    }

    /// Forget the session in memory and delete its stored turns
    pub fn clear_session(&mut self) -> StoreResult<usize> {
        self.messages.clear();
        self.moving_summary.clear();
        let removed = self.store.delete_session_turns(self.user_id, &self.session_id)?;
        info!(user_id = self.user_id, session = %self.session_id, removed, "cleared session");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, ScriptedProvider};
    use crate::storage::NewUser;
    use serde_json::json;

    fn store_with_user() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .unwrap();
        (store, user.id)
    }

    fn turn(user: &str, reply: &str) -> MemoryTurn {
        MemoryTurn {
            user_prompt: user.to_string(),
            full_prompt_sent: format!("system\n{user}"),
            llm_response: reply.to_string(),
            llm_params: Some(json!({"model_name": "gpt"})),
            tokens_used: Some(42),
            estimated_cost_usd: None,
        }
    }

    fn memory(
        store: &Store,
        user_id: i64,
        llm: Arc<ScriptedProvider>,
        limit: usize,
    ) -> ConversationMemory {
        let config = MemoryConfig {
            temperature: 0.1,
            max_token_limit: limit,
        };
        ConversationMemory::load(store.clone(), llm, config, user_id, "s1")
    }

    #[tokio::test]
    async fn persisted_turns_reload_in_order() {
        let (store, user_id) = store_with_user();
        let llm = Arc::new(ScriptedProvider::new("gpt"));
        let mut first = memory(&store, user_id, llm.clone(), 2000);
        first.save_turn(turn("hola", "hola, ¿en qué te ayudo?")).await.unwrap();
        first.save_turn(turn("mis cuentas", "tienes dos")).await.unwrap();

        let reloaded = memory(&store, user_id, llm.clone(), 2000);
        let contents: Vec<_> = reloaded.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hola", "hola, ¿en qué te ayudo?", "mis cuentas", "tienes dos"]);
        assert_eq!(reloaded.messages()[1].role, MessageRole::Assistant);
        assert_eq!(llm.request_count(), 0);

        let stored = store.list_turns(user_id, "s1").unwrap();
        assert_eq!(stored[0].tokens_used, Some(42));
        assert_eq!(stored[0].llm_params, Some(json!({"model_name": "gpt"})));
    }

    #[tokio::test]
    async fn overflow_is_folded_into_the_summary() {
        let (store, user_id) = store_with_user();
        let llm = Arc::new(ScriptedProvider::new("gpt"));
        llm.push_text("User asked about act_1 spend.");
        let mut memory = memory(&store, user_id, llm.clone(), 10);

        memory.save_turn(turn(&"a".repeat(24), &"b".repeat(24))).await.unwrap();
        assert_eq!(memory.messages().len(), 1);
        assert_eq!(memory.buffer_tokens(), 6);
        assert_eq!(memory.moving_summary(), "User asked about act_1 spend.");
        assert_eq!(memory.conversation_summary(), "User asked about act_1 spend.");

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.1));
        assert!(request.messages[0].content.contains("Human: aaaa"));

        let context = memory.context_messages();
        assert_eq!(context[0].role, MessageRole::System);
        assert_eq!(context.len(), 2);
        assert!(memory.session_info().has_summary);
    }

    #[tokio::test]
    async fn summarizer_failure_drops_messages_and_keeps_summary() {
        let (store, user_id) = store_with_user();
        let llm = Arc::new(ScriptedProvider::new("gpt"));
        llm.push_error(LLMError::Network("down".to_string()));
        let mut memory = memory(&store, user_id, llm, 10);

        memory.save_turn(turn(&"a".repeat(24), &"b".repeat(24))).await.unwrap();
        assert_eq!(memory.messages().len(), 1);
        assert_eq!(memory.conversation_summary(), prompts::NO_SUMMARY_YET);
        assert_eq!(store.count_session_turns(user_id, "s1").unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_messages_and_clear_session() {
        let (store, user_id) = store_with_user();
        let llm = Arc::new(ScriptedProvider::new("gpt"));
        let mut memory = memory(&store, user_id, llm, 2000);
        memory.save_turn(turn("uno", "1")).await.unwrap();
        memory.save_turn(turn("dos", "2")).await.unwrap();

        let recent: Vec<_> = memory.recent_messages(3).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, ["1", "dos", "2"]);
        assert_eq!(memory.recent_messages(10).len(), 4);

        assert_eq!(memory.clear_session().unwrap(), 2);
        assert_eq!(
            memory.session_info(),
            SessionInfo {
                user_id,
                session_id: "s1".to_string(),
                message_count: 0,
                has_summary: false,
            }
        );
        assert_eq!(store.count_session_turns(user_id, "s1").unwrap(), 0);
    }
}
