// src/interview/session.rs — Interview session record and its invariants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infra::errors::WinearError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    /// Draft summary produced, final summary not yet.
    AwaitingFinalConfirmation,
    Finalized,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Active => "active",
            Phase::AwaitingFinalConfirmation => "awaiting_final_confirmation",
            Phase::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one interview.
///
/// Fields are private: every mutation goes through a method that keeps the
/// phase and the summaries consistent, so a stored record can never claim a
/// final summary while still `Active`, or lose a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    session_id: String,
    user_id: String,
    turns: Vec<Turn>,
    user_turn_count: u32,
    phase: Phase,
    draft_summary: Option<String>,
    final_summary: Option<String>,
    /// Bumped on every committed write; stores compare-and-swap on it.
    version: u64,
    /// Set while an `end` call is running the hand-off.
    #[serde(default)]
    handoff_claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            turns: Vec::new(),
            user_turn_count: 0,
            phase: Phase::Active,
            draft_summary: None,
            final_summary: None,
            version: 0,
            handoff_claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn user_turn_count(&self) -> u32 {
        self.user_turn_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft_summary(&self) -> Option<&str> {
        self.draft_summary.as_deref()
    }

    pub fn final_summary(&self) -> Option<&str> {
        self.final_summary.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn handoff_claimed_at(&self) -> Option<DateTime<Utc>> {
        self.handoff_claimed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append an accepted user reply.
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), WinearError> {
        self.ensure_open()?;
        self.turns.push(Turn::user(content));
        self.user_turn_count += 1;
        Ok(())
    }

    /// Append a generated assistant question.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<(), WinearError> {
        self.ensure_open()?;
        self.turns.push(Turn::assistant(content));
        Ok(())
    }

    /// True when a draft request would actually produce a draft.
    /// A second request falls through to the normal question path.
    pub fn accepts_draft(&self) -> bool {
        self.phase == Phase::Active && self.draft_summary.is_none()
    }

    /// Store the draft summary and move to `AwaitingFinalConfirmation`.
    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<(), WinearError> {
        if !self.accepts_draft() {
            return Err(WinearError::InvalidInput(format!(
                "session '{}' already has a draft summary (phase: {})",
                self.session_id, self.phase
            )));
        }
        self.draft_summary = Some(draft.into());
        self.phase = Phase::AwaitingFinalConfirmation;
        Ok(())
    }

    /// Store the final summary and move to `Finalized`. Never overwrites.
    pub fn finalize(&mut self, summary: impl Into<String>) -> Result<(), WinearError> {
        self.ensure_open()?;
        self.final_summary = Some(summary.into());
        self.phase = Phase::Finalized;
        Ok(())
    }

    /// Take the hand-off for this caller. Fails with `SessionConflict` while
    /// another claim younger than `lease` is outstanding.
    pub fn claim_handoff(
        &mut self,
        now: DateTime<Utc>,
        lease: std::time::Duration,
    ) -> Result<(), WinearError> {
        if self.phase != Phase::Finalized {
            return Err(WinearError::InvalidInput(format!(
                "session '{}' has no final summary to hand off",
                self.session_id
            )));
        }
        if let Some(claimed_at) = self.handoff_claimed_at {
            let lease_ends = chrono::Duration::from_std(lease)
                .ok()
                .and_then(|lease| claimed_at.checked_add_signed(lease));
            if lease_ends.map_or(true, |ends| now < ends) {
                return Err(WinearError::SessionConflict {
                    session_id: self.session_id.clone(),
                });
            }
        }
        self.handoff_claimed_at = Some(now);
        Ok(())
    }

    pub fn release_handoff(&mut self) {
        self.handoff_claimed_at = None;
    }

    /// Mark the record as the next revision of the one it was cloned from.
    pub fn next_revision(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn ensure_open(&self) -> Result<(), WinearError> {
        if self.phase == Phase::Finalized {
            return Err(WinearError::SessionFinalized {
                session_id: self.session_id.clone(),
            });
        }
        Ok(())
    }
}

/// Proof that an interview's hand-off completed. Outlives the session so a
/// repeated `end` can answer without touching the finalizer again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationReceipt {
    pub session_id: String,
    pub user_id: String,
    pub final_summary: String,
    pub finalized_at: DateTime<Utc>,
}

impl FinalizationReceipt {
    pub fn for_session(session: &InterviewSession) -> Result<Self, WinearError> {
        let final_summary = session.final_summary().ok_or_else(|| {
            WinearError::InvalidInput(format!(
                "session '{}' has no final summary",
                session.session_id()
            ))
        })?;
        Ok(Self {
            session_id: session.session_id().to_string(),
            user_id: session.user_id().to_string(),
            final_summary: final_summary.to_string(),
            finalized_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_session_is_active_and_empty() {
        let s = InterviewSession::new("42");
        assert_eq!(s.user_id(), "42");
        assert_eq!(s.phase(), Phase::Active);
        assert!(s.turns().is_empty());
        assert_eq!(s.user_turn_count(), 0);
        assert_eq!(s.version(), 0);
        assert!(Uuid::parse_str(s.session_id()).is_ok());
    }

    #[test]
    fn test_push_user_counts_only_user_turns() {
        let mut s = InterviewSession::new("u");
        s.push_assistant("Q1").unwrap();
        s.push_user("A1").unwrap();
        s.push_assistant("Q2").unwrap();
        assert_eq!(s.user_turn_count(), 1);
        assert_eq!(
            s.turns(),
            &[Turn::assistant("Q1"), Turn::user("A1"), Turn::assistant("Q2")]
        );
    }

    #[test]
    fn test_draft_set_once() {
        let mut s = InterviewSession::new("u");
        s.set_draft("D").unwrap();
        assert_eq!(s.phase(), Phase::AwaitingFinalConfirmation);
        assert!(!s.accepts_draft());
        assert!(s.set_draft("D2").is_err());
        assert_eq!(s.draft_summary(), Some("D"));
    }

    #[test]
    fn test_finalize_never_overwrites() {
        let mut s = InterviewSession::new("u");
        s.finalize("F").unwrap();
        assert_eq!(s.phase(), Phase::Finalized);
        let err = s.finalize("F2").unwrap_err();
        assert!(matches!(err, WinearError::SessionFinalized { .. }));
        assert_eq!(s.final_summary(), Some("F"));
    }

    #[test]
    fn test_finalized_session_rejects_turns() {
        let mut s = InterviewSession::new("u");
        s.finalize("F").unwrap();
        assert!(s.push_user("late").is_err());
        assert!(s.push_assistant("late").is_err());
        assert!(s.turns().is_empty());
        assert!(!s.accepts_draft());
    }

    #[test]
    fn test_next_revision_bumps_version() {
        let mut s = InterviewSession::new("u");
        s.next_revision();
        s.next_revision();
        assert_eq!(s.version(), 2);
        assert!(s.updated_at() >= s.created_at());
    }

    #[test]
    fn test_serde_roundtrip_preserves_phase() {
        let mut s = InterviewSession::new("u");
        s.push_user("hello").unwrap();
        s.set_draft("draft").unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"awaiting_final_confirmation\""));
        let back: InterviewSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_handoff_claim_is_exclusive_until_lease_ends() {
        let lease = std::time::Duration::from_secs(60);
        let now = Utc::now();
        let mut s = InterviewSession::new("u");
        assert!(matches!(
            s.claim_handoff(now, lease),
            Err(WinearError::InvalidInput(_))
        ));

        s.finalize("F").unwrap();
        s.claim_handoff(now, lease).unwrap();
        assert_eq!(s.handoff_claimed_at(), Some(now));
        assert!(matches!(
            s.claim_handoff(now + chrono::Duration::seconds(30), lease),
            Err(WinearError::SessionConflict { .. })
        ));

        let later = now + chrono::Duration::seconds(61);
        s.claim_handoff(later, lease).unwrap();
        assert_eq!(s.handoff_claimed_at(), Some(later));

        s.release_handoff();
        s.claim_handoff(later, lease).unwrap();
    }

    #[test]
    fn test_record_without_claim_field_deserializes() {
        let s = InterviewSession::new("u");
        let mut value = serde_json::to_value(&s).unwrap();
        value.as_object_mut().unwrap().remove("handoff_claimed_at");
        let back: InterviewSession = serde_json::from_value(value).unwrap();
        assert_eq!(back.handoff_claimed_at(), None);
    }

    #[test]
    fn test_receipt_requires_final_summary() {
        let mut s = InterviewSession::new("u");
        assert!(FinalizationReceipt::for_session(&s).is_err());
        s.finalize("F").unwrap();
        let r = FinalizationReceipt::for_session(&s).unwrap();
        assert_eq!(r.final_summary, "F");
        assert_eq!(r.user_id, "u");
        assert_eq!(r.session_id, s.session_id());
    }
}
