use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{Local, Utc};
use tracing::{info, warn};

use adscope_core::agent::generate_session_id;
use adscope_core::clock::Clock;
use adscope_core::memory::SessionInfo;
use adscope_core::storage::password::verify_password;
use adscope_core::storage::{ConversationTurn, FacebookAccount};

use crate::server::error::ApiError;
use crate::server::schemas::{
    ChatRequest, ChatResponse, HealthResponse, LoginRequest, LoginResponse, SummaryResponse,
};
use crate::server::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        database_connected: state.store.check_connection(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());
    let user = state
        .store
        .find_user_by_email(request.email.trim())?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;
    if !verify_password(&request.password, &user.password_hash) {
        warn!(user_id = user.id, "failed login attempt");
        return Err(invalid());
    }

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        session_id: generate_session_id(&user.email, state.clock.now().with_timezone(&Local)),
        user_id: user.id,
        email: user.email,
        name: user.name,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    state.active_user(request.user_id)?;
    let agent = state
        .agent_for(request.user_id, request.session_id.clone())
        .await?;
    let mut agent = agent.lock().await;
    let response = agent.process_message(&request.message).await;

    Ok(Json(ChatResponse {
        response,
        session_id: agent.session_id().to_string(),
        timestamp: Utc::now(),
        user_id: request.user_id,
    }))
}

pub async fn session_info(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(i64, String)>,
) -> Result<Json<SessionInfo>, ApiError> {
    state.active_user(user_id)?;
    let info = match state.live_agent(user_id, &session_id).await {
        Some(agent) => {
            let agent = agent.lock().await;
            agent.session_info()
        }
        None => state.stored_memory(user_id, &session_id).session_info(),
    };
    Ok(Json(info))
}

pub async fn session_history(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(i64, String)>,
) -> Result<Json<Vec<ConversationTurn>>, ApiError> {
    state.active_user(user_id)?;
    Ok(Json(state.store.list_turns(user_id, &session_id)?))
}

pub async fn session_summary(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(i64, String)>,
) -> Result<Json<SummaryResponse>, ApiError> {
    state.active_user(user_id)?;
    let summary = match state.live_agent(user_id, &session_id).await {
        Some(agent) => {
            let agent = agent.lock().await;
            agent.conversation_summary()
        }
        None => state.stored_memory(user_id, &session_id).conversation_summary(),
    };
    Ok(Json(SummaryResponse {
        session_id,
        summary,
    }))
}

pub async fn clear_session(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state.active_user(user_id)?;
    match state.live_agent(user_id, &session_id).await {
        Some(agent) => {
            agent.lock().await.clear_session()?;
            state.forget_session(user_id, &session_id).await;
        }
        None => {
            state.stored_memory(user_id, &session_id).clear_session()?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<FacebookAccount>>, ApiError> {
    state.active_user(user_id)?;
    Ok(Json(state.store.list_accounts_for_user(user_id)?))
}
