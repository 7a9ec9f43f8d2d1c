// src/interview/machine.rs — Interview state machine
//
// start / reply / end. Each operation reads the session, works on a clone and
// commits it with a compare-and-swap on `version` only after every fallible
// step succeeded, so a failed call leaves the stored record untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use super::finalizer::{RecommendationOutcome, SummaryFinalizer};
use super::generator::QuestionGenerator;
use super::prompts::FINAL_ACKNOWLEDGEMENT;
use super::session::{FinalizationReceipt, InterviewSession, Phase};
use super::SessionStore;
use crate::infra::config::Config;
use crate::infra::errors::WinearError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterviewPolicy {
    pub session_ttl: Duration,
    pub receipt_ttl: Duration,
    /// How long a started hand-off blocks other `end` calls on the session.
    pub handoff_lease: Duration,
    /// Treat a reply as a draft request once this many user turns exist.
    pub auto_draft_after_turns: Option<u32>,
}

impl Default for InterviewPolicy {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(3600),
            receipt_ttl: Duration::from_secs(86_400),
            handoff_lease: Duration::from_secs(120),
            auto_draft_after_turns: None,
        }
    }
}

impl InterviewPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_ttl: config.sessions.ttl(),
            receipt_ttl: config.sessions.receipt_ttl(),
            handoff_lease: config.sessions.handoff_lease(),
            auto_draft_after_turns: config.interview.auto_draft_after_turns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub session_id: String,
    pub assistant: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub session_id: String,
    pub assistant: String,
    /// Set only on the turn that produced the draft.
    pub draft_summary: Option<String>,
    pub phase: Phase,
    pub user_turn_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOutcome {
    pub session_id: String,
    pub assistant: String,
    pub final_summary: String,
    /// `None` when this call did not run the hand-off.
    pub recommendation: Option<RecommendationOutcome>,
    /// The hand-off had already completed before this call.
    pub replayed: bool,
}

/// Per-session async locks, dropped once nobody holds them.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.retain(|_, weak| weak.strong_count() > 0);
            match map.get(session_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(tokio::sync::Mutex::new(()));
                    map.insert(session_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .map(|m| m.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

pub struct InterviewMachine {
    store: Arc<dyn SessionStore>,
    generator: QuestionGenerator,
    finalizer: SummaryFinalizer,
    policy: InterviewPolicy,
    locks: SessionLocks,
}

impl InterviewMachine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: QuestionGenerator,
        finalizer: SummaryFinalizer,
        policy: InterviewPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            finalizer,
            policy,
            locks: SessionLocks::default(),
        }
    }

    pub fn policy(&self) -> &InterviewPolicy {
        &self.policy
    }

    /// Open a new interview and ask the first question.
    pub async fn start(&self, user_id: &str) -> Result<StartOutcome, WinearError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(WinearError::InvalidInput("user_id must not be empty".into()));
        }

        let mut session = InterviewSession::new(user_id);
        let question = self.generator.generate_question(session.turns()).await?;
        session.push_assistant(question.clone())?;
        self.store
            .put(&session, None, self.policy.session_ttl)
            .await?;

        tracing::info!(session_id = session.session_id(), user_id, "Interview started");
        Ok(StartOutcome {
            session_id: session.session_id().to_string(),
            assistant: question,
        })
    }

    /// Accept one user reply and produce the next question, or the draft
    /// summary when one is requested and none exists yet.
    pub async fn reply(
        &self,
        session_id: &str,
        message: &str,
        request_draft: bool,
    ) -> Result<ReplyOutcome, WinearError> {
        let _guard = self.locks.acquire(session_id).await;

        let current = self.load(session_id).await?;
        if current.phase() == Phase::Finalized {
            return Err(WinearError::SessionFinalized {
                session_id: session_id.to_string(),
            });
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(WinearError::InvalidInput("message must not be empty".into()));
        }

        let mut next = current.clone();
        next.push_user(message)?;

        let wants_draft = request_draft
            || self
                .policy
                .auto_draft_after_turns
                .is_some_and(|n| next.user_turn_count() >= n);

        let (assistant, draft_summary) = if wants_draft && next.accepts_draft() {
            let draft = self.generator.draft_summary(next.turns()).await?;
            next.set_draft(draft.clone())?;
            (draft.clone(), Some(draft))
        } else {
            let question = self.generator.generate_question(next.turns()).await?;
            next.push_assistant(question.clone())?;
            (question, None)
        };

        next.next_revision();
        self.store
            .put(&next, Some(current.version()), self.policy.session_ttl)
            .await?;

        tracing::info!(
            session_id,
            user_id = next.user_id(),
            phase = %next.phase(),
            user_turns = next.user_turn_count(),
            drafted = draft_summary.is_some(),
            "Reply accepted"
        );
        Ok(ReplyOutcome {
            session_id: session_id.to_string(),
            assistant,
            draft_summary,
            phase: next.phase(),
            user_turn_count: next.user_turn_count(),
        })
    }

    /// Finalize the interview and hand it off. Safe to repeat: each step is
    /// skipped once it has been done, and a deleted session answers from its
    /// receipt.
    pub async fn end(&self, session_id: &str) -> Result<EndOutcome, WinearError> {
        let _guard = self.locks.acquire(session_id).await;

        let current = match self.store.get(session_id).await? {
            Some(session) => session,
            None => {
                return match self.store.get_receipt(session_id).await? {
                    Some(receipt) => {
                        tracing::debug!(session_id, "End replayed from receipt");
                        Ok(EndOutcome {
                            session_id: session_id.to_string(),
                            assistant: FINAL_ACKNOWLEDGEMENT.to_string(),
                            final_summary: receipt.final_summary,
                            recommendation: None,
                            replayed: true,
                        })
                    }
                    None => Err(WinearError::session_not_found(session_id)),
                };
            }
        };

        let session = if current.final_summary().is_some() {
            current
        } else {
            let summary = self.generator.final_summary(current.turns()).await?;
            let mut next = current.clone();
            next.finalize(summary)?;
            next.next_revision();
            self.store
                .put(&next, Some(current.version()), self.policy.session_ttl)
                .await?;
            next
        };

        let (final_summary, recommendation, replayed) =
            match self.store.get_receipt(session_id).await? {
                Some(receipt) => (receipt.final_summary, None, true),
                None => {
                    let claimed = self.claim_handoff(&session).await?;
                    let result = match self.finalizer.finalize(&claimed).await {
                        Ok(result) => result,
                        Err(e) => {
                            self.release_handoff(&claimed).await;
                            return Err(e);
                        }
                    };
                    let receipt = FinalizationReceipt::for_session(&claimed)?;
                    self.store
                        .put_receipt(&receipt, self.policy.receipt_ttl)
                        .await?;
                    (receipt.final_summary, Some(result.recommendation), false)
                }
            };

        self.store.delete(session_id).await?;

        tracing::info!(
            session_id,
            user_id = session.user_id(),
            user_turns = session.user_turn_count(),
            replayed,
            "Interview finalized"
        );
        Ok(EndOutcome {
            session_id: session_id.to_string(),
            assistant: FINAL_ACKNOWLEDGEMENT.to_string(),
            final_summary,
            recommendation,
            replayed,
        })
    }

    /// Commit a hand-off claim so only one caller, in any process, runs the
    /// finalizer. Losers see `SessionConflict`.
    async fn claim_handoff(
        &self,
        session: &InterviewSession,
    ) -> Result<InterviewSession, WinearError> {
        let mut claimed = session.clone();
        claimed.claim_handoff(Utc::now(), self.policy.handoff_lease)?;
        claimed.next_revision();
        self.store
            .put(&claimed, Some(session.version()), self.policy.session_ttl)
            .await?;
        Ok(claimed)
    }

    /// Give up a claim after a failed hand-off so a retry need not wait for
    /// the lease. If this write fails the lease still runs out.
    async fn release_handoff(&self, claimed: &InterviewSession) {
        let mut released = claimed.clone();
        released.release_handoff();
        released.next_revision();
        if let Err(e) = self
            .store
            .put(&released, Some(claimed.version()), self.policy.session_ttl)
            .await
        {
            tracing::warn!(
                session_id = claimed.session_id(),
                "Could not release hand-off claim: {}",
                e
            );
        }
    }

    /// Current state of a live session.
    pub async fn session(&self, session_id: &str) -> Result<InterviewSession, WinearError> {
        self.load(session_id).await
    }

    async fn load(&self, session_id: &str) -> Result<InterviewSession, WinearError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| WinearError::session_not_found(session_id))
    }
}
