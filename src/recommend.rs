// src/recommend.rs — HTTP client for the recommendation backend

use std::time::Duration;

use async_trait::async_trait;

use crate::infra::config::RecommendationConfig;
use crate::infra::errors::WinearError;
use crate::interview::{Recommendation, RecommendationClient};

pub struct HttpRecommendationClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpRecommendationClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(config.endpoint(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(user_id: &str, summary: Option<&str>) -> serde_json::Value {
        let mut body = serde_json::json!({ "user_id": user_id });
        if let Some(summary) = summary {
            body["summary"] = serde_json::json!(summary);
        }
        body
    }

    fn error(message: String, retriable: bool) -> WinearError {
        WinearError::Provider {
            provider: "recommendation".into(),
            message,
            retriable,
        }
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommendationClient {
    async fn request(
        &self,
        user_id: &str,
        summary: Option<&str>,
    ) -> Result<Recommendation, WinearError> {
        tracing::info!(endpoint = %self.endpoint, user_id, "Requesting recommendations");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&Self::build_body(user_id, summary))
            .send()
            .await
            .map_err(|e| Self::error(e.to_string(), e.is_timeout() || e.is_connect()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error(
                format!("HTTP {}: {}", status, body),
                status.is_server_error(),
            ));
        }

        let mut recommendation: Recommendation = response
            .json()
            .await
            .map_err(|e| Self::error(format!("Failed to parse response: {}", e), false))?;
        if recommendation.user_id.is_empty() {
            recommendation.user_id = user_id.to_string();
        }

        tracing::info!(
            user_id,
            rec_people = recommendation.rec_people.len(),
            rec_travel = recommendation.rec_travel.len(),
            "Recommendations received"
        );
        Ok(recommendation)
    }
}
