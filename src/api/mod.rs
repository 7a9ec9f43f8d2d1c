// src/api/mod.rs — HTTP binding for the interview service

pub mod auth;
pub mod handlers;
pub mod types;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::infra::config::ServerConfig;
use crate::interview::machine::InterviewMachine;
use crate::interview::{ProfileRepository, RecommendationClient};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub machine: Arc<InterviewMachine>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub recommender: Option<Arc<dyn RecommendationClient>>,
    pub token: Option<String>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(origins)
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/chat/start", post(handlers::start_chat))
        .route("/chat/reply", post(handlers::reply_chat))
        .route("/chat/end", post(handlers::end_chat))
        .route("/user-summary", post(handlers::upsert_user_summary))
        .route(
            "/user-summary/{user_id}",
            get(handlers::get_user_summary).delete(handlers::delete_user_summary),
        )
        .route("/recommend", post(handlers::recommend))
        .route("/health", get(handlers::health))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(state, config);

    tracing::info!("API server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down API server");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::WinearError;
    use crate::interview::finalizer::SummaryFinalizer;
    use crate::interview::generator::QuestionGenerator;
    use crate::interview::machine::InterviewPolicy;
    use crate::interview::memory::{MemoryProfileRepository, MemorySessionStore};
    use crate::provider::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct CannedProvider;

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, WinearError> {
            let prompt = &request.messages[0].content;
            let content = if prompt.contains("would like to add") {
                "DRAFT"
            } else if prompt.contains("Summarize the user's answers") {
                "FINAL"
            } else {
                "QUESTION"
            };
            Ok(ChatResponse {
                content: content.into(),
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn test_state(token: Option<&str>) -> ApiState {
        let profiles = Arc::new(MemoryProfileRepository::new());
        let machine = InterviewMachine::new(
            Arc::new(MemorySessionStore::new()),
            QuestionGenerator::new(Arc::new(CannedProvider), "test"),
            SummaryFinalizer::new(profiles.clone(), None),
            InterviewPolicy::default(),
        );
        ApiState {
            machine: Arc::new(machine),
            profiles,
            recommender: None,
            token: token.map(String::from),
        }
    }

    fn app(state: ApiState) -> Router {
        build_router(state, &ServerConfig::default())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app(test_state(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_flow_over_http() {
        let state = test_state(None);

        let resp = app(state.clone())
            .oneshot(post_json("/chat/start", serde_json::json!({"user_id": "42"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let started = json_body(resp).await;
        assert_eq!(started["assistant"], "QUESTION");
        assert_eq!(started["finished"], false);
        let session_id = started["session_id"].as_str().unwrap().to_string();

        let resp = app(state.clone())
            .oneshot(post_json(
                "/chat/reply?return_draft=true",
                serde_json::json!({"session_id": session_id, "message": "beaches"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let drafted = json_body(resp).await;
        assert_eq!(drafted["draft_summary"], "DRAFT");
        assert_eq!(drafted["phase"], "awaiting_final_confirmation");

        let resp = app(state.clone())
            .oneshot(post_json(
                "/chat/end",
                serde_json::json!({"session_id": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let ended = json_body(resp).await;
        assert_eq!(ended["finished"], true);
        assert_eq!(ended["final_summary"], "FINAL");
        assert_eq!(ended["recommendation"]["status"], "disabled");

        let req = Request::builder()
            .uri("/user-summary/42")
            .body(Body::empty())
            .unwrap();
        let resp = app(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["summary"], "FINAL");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let resp = app(test_state(None))
            .oneshot(post_json(
                "/chat/reply",
                serde_json::json!({"session_id": "nope", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(json_body(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("nope"));
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let state = test_state(Some("secret"));

        let resp = app(state.clone())
            .oneshot(post_json("/chat/start", serde_json::json!({"user_id": "42"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut req = post_json("/chat/start", serde_json::json!({"user_id": "42"}));
        req.headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        let resp = app(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_user_summary_delete_missing_is_404() {
        let req = Request::builder()
            .method("DELETE")
            .uri("/user-summary/ghost")
            .body(Body::empty())
            .unwrap();
        let resp = app(test_state(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recommend_disabled_is_503() {
        let resp = app(test_state(None))
            .oneshot(post_json("/recommend", serde_json::json!({"user_id": "42"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
