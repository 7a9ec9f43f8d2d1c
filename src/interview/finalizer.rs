// src/interview/finalizer.rs — Hand-off of a finalized interview
//
// Persists the summary to the profile repository, then asks the
// recommendation backend for matches. Only the profile write can fail the
// hand-off; recommendation trouble is downgraded to a logged outcome.

use std::sync::Arc;

use serde::Serialize;

use super::session::InterviewSession;
use super::{ProfileRepository, Recommendation, RecommendationClient};
use crate::infra::errors::WinearError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Delivered { recommendation: Recommendation },
    /// No recommendation client configured.
    Disabled,
    Degraded { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizationResult {
    pub user_id: String,
    pub recommendation: RecommendationOutcome,
}

pub struct SummaryFinalizer {
    profiles: Arc<dyn ProfileRepository>,
    recommender: Option<Arc<dyn RecommendationClient>>,
}

impl SummaryFinalizer {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        recommender: Option<Arc<dyn RecommendationClient>>,
    ) -> Self {
        Self {
            profiles,
            recommender,
        }
    }

    pub async fn finalize(
        &self,
        session: &InterviewSession,
    ) -> Result<FinalizationResult, WinearError> {
        let summary = session.final_summary().ok_or_else(|| {
            WinearError::InvalidInput(format!(
                "session '{}' is not finalized",
                session.session_id()
            ))
        })?;
        let user_id = session.user_id();

        self.profiles.upsert(user_id, summary).await?;
        tracing::info!(user_id, session_id = session.session_id(), "Profile summary saved");

        let recommendation = match &self.recommender {
            None => RecommendationOutcome::Disabled,
            Some(client) => match client.request(user_id, Some(summary)).await {
                Ok(recommendation) => RecommendationOutcome::Delivered { recommendation },
                Err(e) => {
                    let degraded = WinearError::DownstreamDegraded {
                        service: "recommendation".into(),
                        message: e.to_string(),
                    };
                    tracing::warn!(user_id, "{}", degraded);
                    RecommendationOutcome::Degraded {
                        message: e.to_string(),
                    }
                }
            },
        };

        Ok(FinalizationResult {
            user_id: user_id.to_string(),
            recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::MockProfileRepository;
    use async_trait::async_trait;

    struct FixedRecommender(Result<Recommendation, String>);

    #[async_trait]
    impl RecommendationClient for FixedRecommender {
        async fn request(
            &self,
            user_id: &str,
            summary: Option<&str>,
        ) -> Result<Recommendation, WinearError> {
            assert_eq!(summary, Some("likes hiking"));
            match &self.0 {
                Ok(r) => Ok(Recommendation {
                    user_id: user_id.to_string(),
                    ..r.clone()
                }),
                Err(message) => Err(WinearError::Provider {
                    provider: "recommendation".into(),
                    message: message.clone(),
                    retriable: true,
                }),
            }
        }
    }

    fn finalized_session() -> InterviewSession {
        let mut s = InterviewSession::new("42");
        s.push_user("I like hiking").unwrap();
        s.finalize("likes hiking").unwrap();
        s
    }

    fn expecting_upsert() -> MockProfileRepository {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_upsert()
            .withf(|user_id, summary| user_id == "42" && summary == "likes hiking")
            .times(1)
            .returning(|_, _| Ok(()));
        profiles
    }

    #[tokio::test]
    async fn test_delivered_recommendation() {
        let rec = Recommendation {
            user_id: String::new(),
            rec_people: vec!["7".into()],
            rec_travel: vec!["Jeju".into()],
            status: "success".into(),
        };
        let finalizer = SummaryFinalizer::new(
            Arc::new(expecting_upsert()),
            Some(Arc::new(FixedRecommender(Ok(rec)))),
        );
        let result = finalizer.finalize(&finalized_session()).await.unwrap();
        match result.recommendation {
            RecommendationOutcome::Delivered { recommendation } => {
                assert_eq!(recommendation.user_id, "42");
                assert_eq!(recommendation.rec_travel, vec!["Jeju".to_string()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recommendation_failure_is_degraded() {
        let finalizer = SummaryFinalizer::new(
            Arc::new(expecting_upsert()),
            Some(Arc::new(FixedRecommender(Err("connection refused".into())))),
        );
        let result = finalizer.finalize(&finalized_session()).await.unwrap();
        assert!(matches!(
            result.recommendation,
            RecommendationOutcome::Degraded { ref message } if message.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn test_disabled_recommendation() {
        let finalizer = SummaryFinalizer::new(Arc::new(expecting_upsert()), None);
        let result = finalizer.finalize(&finalized_session()).await.unwrap();
        assert_eq!(result.recommendation, RecommendationOutcome::Disabled);
        assert_eq!(result.user_id, "42");
    }

    #[tokio::test]
    async fn test_profile_failure_propagates() {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_upsert()
            .times(1)
            .returning(|_, _| Err(WinearError::StoreUnavailable("down".into())));
        let finalizer = SummaryFinalizer::new(Arc::new(profiles), None);
        let err = finalizer.finalize(&finalized_session()).await.unwrap_err();
        assert!(matches!(err, WinearError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unfinalized_session_is_rejected() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_upsert().never();
        let finalizer = SummaryFinalizer::new(Arc::new(profiles), None);
        let err = finalizer
            .finalize(&InterviewSession::new("42"))
            .await
            .unwrap_err();
        assert!(matches!(err, WinearError::InvalidInput(_)));
    }
}
