// src/interview/mod.rs — Conversational interview core
//
// The state machine is the only writer of session state. Everything it talks
// to sits behind one of the narrow traits below so storage, profile
// persistence and the recommendation backend can be swapped or mocked.

pub mod finalizer;
pub mod generator;
pub mod machine;
pub mod memory;
pub mod prompts;
pub mod session;
pub mod topics;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infra::errors::WinearError;
pub use session::{FinalizationReceipt, InterviewSession, Phase, Turn, TurnRole};

/// TTL-bounded storage for live interview sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session. Expired and deleted sessions are `None`.
    async fn get(&self, session_id: &str) -> Result<Option<InterviewSession>, WinearError>;

    /// Write `session` and refresh its TTL.
    ///
    /// `expected_version` is the version the caller read: `None` creates the
    /// session and fails with `SessionConflict` if a live one exists;
    /// `Some(v)` replaces it only if the stored version is still `v`
    /// (`SessionNotFound` if it expired meanwhile, `SessionConflict` if
    /// another writer got there first).
    async fn put(
        &self,
        session: &InterviewSession,
        expected_version: Option<u64>,
        ttl: Duration,
    ) -> Result<(), WinearError>;

    async fn delete(&self, session_id: &str) -> Result<(), WinearError>;

    async fn put_receipt(
        &self,
        receipt: &FinalizationReceipt,
        ttl: Duration,
    ) -> Result<(), WinearError>;

    async fn get_receipt(&self, session_id: &str)
        -> Result<Option<FinalizationReceipt>, WinearError>;

    /// Drop expired sessions and receipts. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, WinearError>;
}

/// Durable per-user summary produced by a finalized interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfileSummary {
    pub user_id: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert or replace the summary for `user_id`.
    async fn upsert(&self, user_id: &str, summary: &str) -> Result<(), WinearError>;

    async fn get(&self, user_id: &str) -> Result<Option<UserProfileSummary>, WinearError>;

    /// Returns whether a summary existed.
    async fn delete(&self, user_id: &str) -> Result<bool, WinearError>;
}

/// What the recommendation backend answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub rec_people: Vec<String>,
    #[serde(default)]
    pub rec_travel: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "success".into()
}

#[async_trait]
pub trait RecommendationClient: Send + Sync {
    /// Ask the backend for recommendations, optionally carrying a fresh summary.
    async fn request(
        &self,
        user_id: &str,
        summary: Option<&str>,
    ) -> Result<Recommendation, WinearError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_defaults_missing_fields() {
        let r: Recommendation = serde_json::from_str(r#"{"user_id": "42"}"#).unwrap();
        assert_eq!(r.user_id, "42");
        assert!(r.rec_people.is_empty());
        assert!(r.rec_travel.is_empty());
        assert_eq!(r.status, "success");
    }
}
