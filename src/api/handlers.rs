// src/api/handlers.rs

use crate::api::{auth, types::*, ApiState};
use crate::infra::errors::WinearError;
use crate::interview::{Recommendation, UserProfileSummary};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a domain error onto an HTTP status.
pub fn status_for(e: &WinearError) -> StatusCode {
    match e {
        WinearError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        WinearError::SessionFinalized { .. } | WinearError::SessionConflict { .. } => {
            StatusCode::CONFLICT
        }
        WinearError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        WinearError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        WinearError::GenerationFailure { .. }
        | WinearError::StoreUnavailable(_)
        | WinearError::DownstreamDegraded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        WinearError::Provider { .. } | WinearError::RateLimited { .. } => StatusCode::BAD_GATEWAY,
        WinearError::Database(_)
        | WinearError::Config(_)
        | WinearError::Io(_)
        | WinearError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(e: WinearError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "Request failed: {}", e);
    } else {
        tracing::debug!(status = status.as_u16(), "Request rejected: {}", e);
    }
    error(status, e.to_string())
}

/// POST /chat/start — Open an interview and return the first question.
pub async fn start_chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ChatStartRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    auth::check_auth(&state, &headers)?;

    let started = state.machine.start(&body.user_id).await.map_err(api_error)?;
    Ok(Json(ChatResponse {
        session_id: started.session_id,
        assistant: started.assistant,
        finished: false,
        draft_summary: None,
        final_summary: None,
        phase: Some("active".into()),
    }))
}

/// POST /chat/reply?return_draft=bool — Submit one answer.
pub async fn reply_chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ReplyQuery>,
    Json(body): Json<ReplyRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    auth::check_auth(&state, &headers)?;

    let reply = state
        .machine
        .reply(&body.session_id, &body.message, query.return_draft)
        .await
        .map_err(api_error)?;
    Ok(Json(ChatResponse {
        session_id: reply.session_id,
        assistant: reply.assistant,
        finished: false,
        draft_summary: reply.draft_summary,
        final_summary: None,
        phase: Some(reply.phase.as_str().into()),
    }))
}

/// POST /chat/end — Finalize the interview. Repeatable.
pub async fn end_chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ChatEndRequest>,
) -> Result<Json<ChatEndResponse>, ApiError> {
    auth::check_auth(&state, &headers)?;

    let ended = state.machine.end(&body.session_id).await.map_err(api_error)?;
    Ok(Json(ChatEndResponse {
        chat: ChatResponse {
            session_id: ended.session_id,
            assistant: ended.assistant,
            finished: true,
            draft_summary: None,
            final_summary: Some(ended.final_summary),
            phase: Some("finalized".into()),
        },
        recommendation: ended.recommendation,
    }))
}

/// GET /user-summary/{user_id}
pub async fn get_user_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfileSummary>, ApiError> {
    auth::check_auth(&state, &headers)?;

    match state.profiles.get(&user_id).await.map_err(api_error)? {
        Some(summary) => Ok(Json(summary)),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("No summary for user '{user_id}'"),
        )),
    }
}

/// POST /user-summary — Insert or replace a summary by hand.
pub async fn upsert_user_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<UserSummaryRequest>,
) -> Result<StatusCode, ApiError> {
    auth::check_auth(&state, &headers)?;

    if body.user_id.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "user_id cannot be empty"));
    }
    state
        .profiles
        .upsert(&body.user_id, &body.summary)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /user-summary/{user_id}
pub async fn delete_user_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth::check_auth(&state, &headers)?;

    if state.profiles.delete(&user_id).await.map_err(api_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error(
            StatusCode::NOT_FOUND,
            format!("No summary for user '{user_id}'"),
        ))
    }
}

/// POST /recommend — Ask the recommendation backend directly.
pub async fn recommend(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, ApiError> {
    auth::check_auth(&state, &headers)?;

    let Some(client) = state.recommender.as_ref() else {
        return Err(error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Recommendation backend is disabled",
        ));
    };
    let recommendation = client.request(&body.user_id, None).await.map_err(api_error)?;
    Ok(Json(recommendation))
}

/// GET /health — Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&WinearError::session_not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&WinearError::SessionConflict {
                session_id: "x".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&WinearError::GenerationTimeout { timeout_secs: 30 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&WinearError::StoreUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&WinearError::InvalidInput("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&WinearError::Config("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
