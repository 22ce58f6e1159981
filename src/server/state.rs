use chrono::Local;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use adscope_core::agent::{AgentContext, MarketingAgent, generate_session_id};
use adscope_core::clock::Clock;
use adscope_core::config::AdscopeConfig;
use adscope_core::facebook::AdsInsightsSource;
use adscope_core::llm::LLMProvider;
use adscope_core::memory::ConversationMemory;
use adscope_core::storage::{Store, User};

use crate::server::error::ApiError;

pub type SharedAgent = Arc<Mutex<MarketingAgent>>;

type SessionKey = (i64, String);

/// Shared services behind every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdscopeConfig>,
    pub store: Store,
    pub llm: Arc<dyn LLMProvider>,
    pub insights: Arc<dyn AdsInsightsSource>,
    pub clock: Arc<dyn Clock>,
    sessions: Arc<Mutex<LruCache<SessionKey, SharedAgent>>>,
}

impl AppState {
    pub fn new(
        config: AdscopeConfig,
        store: Store,
        llm: Arc<dyn LLMProvider>,
        insights: Arc<dyn AdsInsightsSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity =
            NonZeroUsize::new(config.server.max_live_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            config: Arc::new(config),
            store,
            llm,
            insights,
            clock,
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn agent_context(&self) -> AgentContext {
        AgentContext::from_config(
            &self.config,
            self.store.clone(),
            self.llm.clone(),
            self.insights.clone(),
            self.clock.clone(),
        )
    }

    /// Active user or the matching HTTP error
    pub fn active_user(&self, user_id: i64) -> Result<User, ApiError> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
        if !user.is_active {
            return Err(ApiError::Forbidden(format!("User {user_id} is inactive")));
        }
        Ok(user)
    }

    /// Agent for the session, reusing the live one so its summary survives between requests.
    ///
    /// Without a session id a new one is generated from the clock. The least recently used
    /// agent is dropped once `server.max_live_sessions` are live; its turns stay in the store.
    pub async fn agent_for(
        &self,
        user_id: i64,
        session_id: Option<String>,
    ) -> Result<SharedAgent, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session_id = match session_id.filter(|id| !id.trim().is_empty()) {
            Some(session_id) => {
                if let Some(agent) = sessions.get(&(user_id, session_id.clone())) {
                    return Ok(agent.clone());
                }
                session_id
            }
            None => self.fresh_session_id(&sessions, user_id),
        };

        let agent = MarketingAgent::new(self.agent_context(), user_id, Some(session_id.clone()))?;
        let agent = Arc::new(Mutex::new(agent));
        debug!(user_id, session = %session_id, "started agent session");
        if let Some(((evicted_user, evicted_session), _)) =
            sessions.push((user_id, session_id), agent.clone())
        {
            debug!(
                user_id = evicted_user,
                session = %evicted_session,
                "evicted idle agent session"
            );
        }
        Ok(agent)
    }

    /// Live agent for the session, if one is held; never creates one
    pub async fn live_agent(&self, user_id: i64, session_id: &str) -> Option<SharedAgent> {
        self.sessions
            .lock()
            .await
            .peek(&(user_id, session_id.to_string()))
            .cloned()
    }

    /// Stored view of a session that is not live, for read-only routes
    pub fn stored_memory(&self, user_id: i64, session_id: &str) -> ConversationMemory {
        ConversationMemory::load(
            self.store.clone(),
            self.llm.clone(),
            self.config.memory.clone(),
            user_id,
            session_id,
        )
    }

    pub async fn forget_session(&self, user_id: i64, session_id: &str) {
        self.sessions
            .lock()
            .await
            .pop(&(user_id, session_id.to_string()));
    }

    pub async fn live_session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Clock-based session id, suffixed when that second is already taken by a live session
    fn fresh_session_id(
        &self,
        sessions: &LruCache<SessionKey, SharedAgent>,
        user_id: i64,
    ) -> String {
        let now = self.clock.now().with_timezone(&Local);
        let base = generate_session_id(&user_id.to_string(), now);
        let mut candidate = base.clone();
        let mut attempt = 2;
        while sessions.contains(&(user_id, candidate.clone())) {
            candidate = format!("{base}_{attempt}");
            attempt += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adscope_core::clock::FixedClock;
    use adscope_core::facebook::FixtureInsightsSource;
    use adscope_core::llm::ScriptedProvider;
    use adscope_core::storage::NewUser;
    use chrono::{TimeZone, Utc};

    fn state(max_live_sessions: usize) -> (AppState, i64) {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "unused".to_string(),
            })
            .unwrap();
        let mut config = AdscopeConfig::default();
        config.server.max_live_sessions = max_live_sessions;
        let state = AppState::new(
            config,
            store,
            Arc::new(ScriptedProvider::new("gpt-4o")),
            Arc::new(FixtureInsightsSource::new()),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap())),
        );
        (state, user.id)
    }

    #[tokio::test]
    async fn live_sessions_are_bounded() {
        let (state, user_id) = state(3);
        for i in 0..100 {
            state.agent_for(user_id, Some(format!("s{i}"))).await.unwrap();
        }
        assert_eq!(state.live_session_count().await, 3);
        assert!(state.live_agent(user_id, "s0").await.is_none());
        assert!(state.live_agent(user_id, "s99").await.is_some());
    }

    #[tokio::test]
    async fn reuse_keeps_a_session_recently_used() {
        let (state, user_id) = state(2);
        let first = state.agent_for(user_id, Some("a".into())).await.unwrap();
        state.agent_for(user_id, Some("b".into())).await.unwrap();
        let again = state.agent_for(user_id, Some("a".into())).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        state.agent_for(user_id, Some("c".into())).await.unwrap();
        assert!(state.live_agent(user_id, "a").await.is_some());
        assert!(state.live_agent(user_id, "b").await.is_none());
    }

    #[tokio::test]
    async fn lookups_never_create_sessions() {
        let (state, user_id) = state(4);
        for i in 0..10 {
            let session = format!("unknown-{i}");
            assert!(state.live_agent(user_id, &session).await.is_none());
            assert_eq!(state.stored_memory(user_id, &session).session_info().message_count, 0);
        }
        assert_eq!(state.live_session_count().await, 0);
    }

    #[tokio::test]
    async fn sessions_started_in_the_same_second_get_distinct_ids() {
        let (state, user_id) = state(4);
        let first = state.agent_for(user_id, None).await.unwrap();
        let second = state.agent_for(user_id, None).await.unwrap();

        let first_id = first.lock().await.session_id().to_string();
        let second_id = second.lock().await.session_id().to_string();
        let expected = generate_session_id(
            &user_id.to_string(),
            state.clock.now().with_timezone(&Local),
        );
        assert_eq!(first_id, expected);
        assert_eq!(second_id, format!("{expected}_2"));
        assert_eq!(state.live_session_count().await, 2);
    }
}
