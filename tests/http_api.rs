use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Local, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use adscope::server::{AppState, router};
use adscope_core::agent::generate_session_id;
use adscope_core::clock::{Clock, FixedClock};
use adscope_core::config::AdscopeConfig;
use adscope_core::config::constants::prompts;
use adscope_core::facebook::FixtureInsightsSource;
use adscope_core::llm::ScriptedProvider;
use adscope_core::storage::password::hash_password;
use adscope_core::storage::{NewFacebookAccount, NewUser, Store};

struct TestApp {
    router: Router,
    store: Store,
    llm: Arc<ScriptedProvider>,
    state: AppState,
    user_id: i64,
}

impl TestApp {
    fn new() -> Self {
        let store = Store::open_in_memory().unwrap();
        store.migrate_to_latest().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: hash_password("correct horse").unwrap(),
            })
            .unwrap();
        let account = store
            .create_facebook_account(&NewFacebookAccount {
                ad_account_id: "act_111".to_string(),
                account_name: Some("Inmobiliaria Canquén".to_string()),
                key_vault_secret_name: "fb-token-111".to_string(),
            })
            .unwrap();
        store.assign_account_to_user(user.id, account.id, None, None).unwrap();
        store
            .create_prompt_version(prompts::SYSTEM_PROMPT_NAME, "v1", "Eres un analista.", true)
            .unwrap();

        let llm = Arc::new(ScriptedProvider::new("gpt-4o"));
        let state = AppState::new(
            AdscopeConfig::default(),
            store.clone(),
            llm.clone(),
            Arc::new(FixtureInsightsSource::new()),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap())),
        );

        Self {
            router: router(state.clone()),
            store,
            llm,
            state,
            user_id: user.id,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn health_reports_database_connectivity() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database_connected"], true);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/login",
            Some(json!({"email": "ana@example.com", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], app.user_id);
    assert_eq!(body["name"], "Ana");
    let expected = generate_session_id(
        "ana@example.com",
        app.state.clock.now().with_timezone(&Local),
    );
    assert_eq!(body["session_id"], expected);

    let (status, body) = app
        .send(
            Method::POST,
            "/login",
            Some(json!({"email": "ana@example.com", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid email or password");

    let (status, _) = app
        .send(
            Method::POST,
            "/login",
            Some(json!({"email": "nobody@example.com", "password": "correct horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_rejects_unknown_and_inactive_users() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/chat", Some(json!({"user_id": 999, "message": "hola"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    app.store.set_user_active(app.user_id, false).unwrap();
    let (status, _) = app
        .send(Method::POST, "/chat", Some(json!({"user_id": app.user_id, "message": "hola"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.llm.request_count(), 0);
}

#[tokio::test]
async fn chat_session_lifecycle() {
    let app = TestApp::new();
    app.llm.push_text("¡Hola Ana! ¿En qué te ayudo?");

    let (status, body) = app
        .send(
            Method::POST,
            "/chat",
            Some(json!({"user_id": app.user_id, "message": "Hola", "session_id": "s1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "¡Hola Ana! ¿En qué te ayudo?");
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["user_id"], app.user_id);

    let base = format!("/sessions/{}/s1", app.user_id);
    let (status, info) = app.send(Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["message_count"], 2);
    assert_eq!(info["has_summary"], false);

    let (_, history) = app.send(Method::GET, &format!("{base}/history"), None).await;
    let turns = history.as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["user_prompt"], "Hola");

    let (_, summary) = app.send(Method::GET, &format!("{base}/summary"), None).await;
    assert_eq!(summary["summary"], prompts::NO_SUMMARY_YET);

    let (status, _) = app.send(Method::DELETE, &base, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.count_session_turns(app.user_id, "s1").unwrap(), 0);

    let (_, info) = app.send(Method::GET, &base, None).await;
    assert_eq!(info["message_count"], 0);
}

#[tokio::test]
async fn chat_without_session_id_starts_a_new_one() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/chat", Some(json!({"user_id": app.user_id, "message": "hola"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap();
    assert!(session_id.ends_with(&format!("_{}", app.user_id)));
    assert_eq!(app.store.count_session_turns(app.user_id, session_id).unwrap(), 1);
}

#[tokio::test]
async fn lists_assigned_accounts() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, &format!("/users/{}/accounts", app.user_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let accounts = body.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["ad_account_id"], "act_111");
    assert_eq!(accounts[0]["account_name"], "Inmobiliaria Canquén");
}

#[tokio::test]
async fn reading_unknown_sessions_does_not_keep_agents_alive() {
    let app = TestApp::new();
    for i in 0..20 {
        let uri = format!("/sessions/{}/ghost-{i}", app.user_id);
        let (status, body) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 0);

        let (status, _) = app.send(Method::GET, &format!("{uri}/summary"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    assert_eq!(app.state.live_session_count().await, 0);
}
