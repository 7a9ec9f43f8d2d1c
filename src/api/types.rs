// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::interview::finalizer::RecommendationOutcome;

/// Request body for `POST /chat/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStartRequest {
    pub user_id: String,
}

/// Request body for `POST /chat/reply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub session_id: String,
    pub message: String,
}

/// Query string for `POST /chat/reply`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyQuery {
    #[serde(default)]
    pub return_draft: bool,
}

/// Request body for `POST /chat/end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEndRequest {
    pub session_id: String,
}

/// Response for every `/chat/*` route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub assistant: String,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Final response additionally carries the recommendation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEndResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationOutcome>,
}

/// Request body for `POST /user-summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummaryRequest {
    pub user_id: String,
    pub summary: String,
}

/// Request body for `POST /recommend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
