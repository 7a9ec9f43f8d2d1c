// src/interview/memory.rs — In-process session store and profile repository
//
// Used by tests and by single-process deployments configured with
// `sessions.backend = "memory"`. Reads skip expired entries; `purge_expired`
// reclaims them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    FinalizationReceipt, InterviewSession, ProfileRepository, SessionStore, UserProfileSummary,
};
use crate::infra::errors::WinearError;

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, Expiring<InterviewSession>>,
    receipts: HashMap<String, Expiring<FinalizationReceipt>>,
}

#[derive(Default)]
pub struct MemorySessionStore {
    tables: Mutex<Tables>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, WinearError> {
        self.tables
            .lock()
            .map_err(|_| WinearError::StoreUnavailable("memory session store poisoned".into()))
    }

    /// Number of live sessions (expired entries excluded).
    pub fn live_sessions(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|t| t.sessions.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<InterviewSession>, WinearError> {
        let now = Instant::now();
        let mut tables = self.lock()?;
        match tables.sessions.get(session_id) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                tables.sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        session: &InterviewSession,
        expected_version: Option<u64>,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        let now = Instant::now();
        let mut tables = self.lock()?;
        let session_id = session.session_id();
        let current = tables
            .sessions
            .get(session_id)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.version());

        match (expected_version, current) {
            (None, Some(_)) => {
                return Err(WinearError::SessionConflict {
                    session_id: session_id.to_string(),
                })
            }
            (Some(_), None) => return Err(WinearError::session_not_found(session_id)),
            (Some(expected), Some(found)) if expected != found => {
                return Err(WinearError::SessionConflict {
                    session_id: session_id.to_string(),
                })
            }
            _ => {}
        }

        tables.sessions.insert(
            session_id.to_string(),
            Expiring::new(session.clone(), ttl),
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), WinearError> {
        self.lock()?.sessions.remove(session_id);
        Ok(())
    }

    async fn put_receipt(
        &self,
        receipt: &FinalizationReceipt,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        self.lock()?.receipts.insert(
            receipt.session_id.clone(),
            Expiring::new(receipt.clone(), ttl),
        );
        Ok(())
    }

    async fn get_receipt(
        &self,
        session_id: &str,
    ) -> Result<Option<FinalizationReceipt>, WinearError> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .receipts
            .get(session_id)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn purge_expired(&self) -> Result<usize, WinearError> {
        let now = Instant::now();
        let mut tables = self.lock()?;
        let before = tables.sessions.len() + tables.receipts.len();
        tables.sessions.retain(|_, e| e.is_live(now));
        tables.receipts.retain(|_, e| e.is_live(now));
        Ok(before - tables.sessions.len() - tables.receipts.len())
    }
}

#[derive(Default)]
pub struct MemoryProfileRepository {
    summaries: Mutex<HashMap<String, UserProfileSummary>>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, UserProfileSummary>>, WinearError> {
        self.summaries
            .lock()
            .map_err(|_| WinearError::StoreUnavailable("memory profile repository poisoned".into()))
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn upsert(&self, user_id: &str, summary: &str) -> Result<(), WinearError> {
        let now = Utc::now();
        let mut summaries = self.lock()?;
        summaries
            .entry(user_id.to_string())
            .and_modify(|s| {
                s.summary = summary.to_string();
                s.updated_at = now;
            })
            .or_insert_with(|| UserProfileSummary {
                user_id: user_id.to_string(),
                summary: summary.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserProfileSummary>, WinearError> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, WinearError> {
        Ok(self.lock()?.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemorySessionStore::new();
        let session = InterviewSession::new("42");
        store.put(&session, None, TTL).await.unwrap();
        let loaded = store.get(session.session_id()).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.live_sessions(), 1);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = MemorySessionStore::new();
        let session = InterviewSession::new("42");
        store.put(&session, None, TTL).await.unwrap();
        let err = store.put(&session, None, TTL).await.unwrap_err();
        assert!(matches!(err, WinearError::SessionConflict { .. }));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemorySessionStore::new();
        let session = InterviewSession::new("42");
        store.put(&session, None, TTL).await.unwrap();

        let mut first = session.clone();
        first.push_user("a").unwrap();
        first.next_revision();
        store.put(&first, Some(0), TTL).await.unwrap();

        let mut second = session.clone();
        second.push_user("b").unwrap();
        second.next_revision();
        let err = store.put(&second, Some(0), TTL).await.unwrap_err();
        assert!(matches!(err, WinearError::SessionConflict { .. }));

        let stored = store.get(session.session_id()).await.unwrap().unwrap();
        assert_eq!(stored.turns()[0].content, "a");
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let store = MemorySessionStore::new();
        let session = InterviewSession::new("42");
        store.put(&session, None, Duration::ZERO).await.unwrap();
        assert!(store.get(session.session_id()).await.unwrap().is_none());

        let err = store.put(&session, Some(0), TTL).await.unwrap_err();
        assert!(matches!(err, WinearError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_and_receipt() {
        let store = MemorySessionStore::new();
        let mut session = InterviewSession::new("42");
        store.put(&session, None, TTL).await.unwrap();
        store.delete(session.session_id()).await.unwrap();
        assert!(store.get(session.session_id()).await.unwrap().is_none());

        session.finalize("F").unwrap();
        let receipt = FinalizationReceipt::for_session(&session).unwrap();
        store.put_receipt(&receipt, TTL).await.unwrap();
        assert_eq!(
            store.get_receipt(session.session_id()).await.unwrap(),
            Some(receipt)
        );
    }

    #[tokio::test]
    async fn test_purge_reclaims_expired_entries() {
        let store = MemorySessionStore::new();
        for _ in 0..100 {
            let mut session = InterviewSession::new("42");
            store.put(&session, None, Duration::ZERO).await.unwrap();
            session.finalize("F").unwrap();
            let receipt = FinalizationReceipt::for_session(&session).unwrap();
            store.put_receipt(&receipt, Duration::ZERO).await.unwrap();
        }
        let live = InterviewSession::new("7");
        store.put(&live, None, TTL).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 200);
        {
            let tables = store.lock().unwrap();
            assert_eq!(tables.sessions.len(), 1);
            assert!(tables.receipts.is_empty());
        }
        assert!(store.get(live.session_id()).await.unwrap().is_some());
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_profile_upsert_replaces_summary() {
        let repo = MemoryProfileRepository::new();
        repo.upsert("42", "first").await.unwrap();
        repo.upsert("42", "second").await.unwrap();
        let s = repo.get("42").await.unwrap().unwrap();
        assert_eq!(s.summary, "second");
        assert!(s.updated_at >= s.created_at);
        assert!(repo.delete("42").await.unwrap());
        assert!(!repo.delete("42").await.unwrap());
    }
}
