// src/storage/store.rs — SQLite operations
//
// Synchronous; owned by the store server task. Expiry is stored as epoch
// millis and a row counts as live while `expires_at > now`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::infra::errors::WinearError;
use crate::interview::{FinalizationReceipt, InterviewSession, UserProfileSummary};

/// Low-level SQLite operations for sessions, receipts and user summaries.
pub struct Store {
    conn: Connection,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, WinearError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| WinearError::StoreUnavailable(format!("bad timestamp '{raw}': {e}")))
}

fn corrupt(what: &str, e: serde_json::Error) -> WinearError {
    WinearError::StoreUnavailable(format!("corrupt {what} record: {e}"))
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Sessions --

    pub fn get_session(&self, id: &str) -> Result<Option<InterviewSession>, WinearError> {
        let state: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM sessions WHERE id = ?1 AND expires_at > ?2",
                params![id, now_millis()],
                |r| r.get(0),
            )
            .optional()?;
        state
            .map(|s| serde_json::from_str(&s).map_err(|e| corrupt("session", e)))
            .transpose()
    }

    /// Compare-and-swap write. See `SessionStore::put` for the contract.
    pub fn put_session(
        &self,
        session: &InterviewSession,
        expected_version: Option<u64>,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        let id = session.session_id();
        let state = serde_json::to_string(session).map_err(|e| corrupt("session", e))?;

        let tx = self.conn.unchecked_transaction()?;
        let current: Option<i64> = tx
            .query_row(
                "SELECT version FROM sessions WHERE id = ?1 AND expires_at > ?2",
                params![id, now_millis()],
                |r| r.get(0),
            )
            .optional()?;

        let conflict = || WinearError::SessionConflict {
            session_id: id.to_string(),
        };
        match (expected_version, current) {
            (None, Some(_)) => return Err(conflict()),
            (Some(_), None) => return Err(WinearError::session_not_found(id)),
            (Some(expected), Some(found)) if expected as i64 != found => return Err(conflict()),
            _ => {}
        }

        tx.execute(
            "INSERT INTO sessions (id, user_id, version, phase, state, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                version = excluded.version,
                phase = excluded.phase,
                state = excluded.state,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                id,
                session.user_id(),
                session.version() as i64,
                session.phase().as_str(),
                state,
                expiry(ttl),
                session.updated_at().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_session(&self, id: &str) -> Result<(), WinearError> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    // -- Finalization receipts --

    pub fn put_receipt(
        &self,
        receipt: &FinalizationReceipt,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO finalization_receipts
             (session_id, user_id, final_summary, finalized_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                receipt.session_id,
                receipt.user_id,
                receipt.final_summary,
                receipt.finalized_at.to_rfc3339(),
                expiry(ttl),
            ],
        )?;
        Ok(())
    }

    pub fn get_receipt(&self, session_id: &str) -> Result<Option<FinalizationReceipt>, WinearError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT user_id, final_summary, finalized_at FROM finalization_receipts
                 WHERE session_id = ?1 AND expires_at > ?2",
                params![session_id, now_millis()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        row.map(|(user_id, final_summary, finalized_at)| {
            Ok(FinalizationReceipt {
                session_id: session_id.to_string(),
                user_id,
                final_summary,
                finalized_at: parse_time(&finalized_at)?,
            })
        })
        .transpose()
    }

    /// Remove expired sessions and receipts. Returns rows deleted.
    pub fn purge_expired(&self) -> Result<usize, WinearError> {
        let now = now_millis();
        let sessions = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
        let receipts = self.conn.execute(
            "DELETE FROM finalization_receipts WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(sessions + receipts)
    }

    // -- User summaries --

    pub fn upsert_summary(&self, user_id: &str, summary: &str) -> Result<(), WinearError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_summary (user_id, summary, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                summary = excluded.summary,
                updated_at = excluded.updated_at",
            params![user_id, summary, now],
        )?;
        Ok(())
    }

    pub fn get_summary(&self, user_id: &str) -> Result<Option<UserProfileSummary>, WinearError> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT summary, created_at, updated_at FROM user_summary WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        row.map(|(summary, created_at, updated_at)| {
            Ok(UserProfileSummary {
                user_id: user_id.to_string(),
                summary,
                created_at: parse_time(&created_at)?,
                updated_at: parse_time(&updated_at)?,
            })
        })
        .transpose()
    }

    pub fn delete_summary(&self, user_id: &str) -> Result<bool, WinearError> {
        let deleted = self
            .conn
            .execute("DELETE FROM user_summary WHERE user_id = ?1", params![user_id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    fn store() -> Store {
        let conn = Connection::open_in_memory().unwrap();
        schema::run_migrations(&conn).unwrap();
        Store::new(conn)
    }

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_session_roundtrip() {
        let store = store();
        let mut session = InterviewSession::new("42");
        session.push_assistant("Q1").unwrap();
        store.put_session(&session, None, TTL).unwrap();
        assert_eq!(
            store.get_session(session.session_id()).unwrap(),
            Some(session)
        );
    }

    #[test]
    fn test_cas_rejects_stale_version() {
        let store = store();
        let session = InterviewSession::new("42");
        store.put_session(&session, None, TTL).unwrap();

        let mut next = session.clone();
        next.push_user("hi").unwrap();
        next.next_revision();
        store.put_session(&next, Some(0), TTL).unwrap();

        let err = store.put_session(&next, Some(0), TTL).unwrap_err();
        assert!(matches!(err, WinearError::SessionConflict { .. }));
        let err = store.put_session(&session, None, TTL).unwrap_err();
        assert!(matches!(err, WinearError::SessionConflict { .. }));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let store = store();
        let session = InterviewSession::new("42");
        store.put_session(&session, None, Duration::ZERO).unwrap();
        assert_eq!(store.get_session(session.session_id()).unwrap(), None);
        assert_eq!(store.purge_expired().unwrap(), 1);
        // An expired row does not block re-creation.
        store.put_session(&session, None, TTL).unwrap();
    }

    #[test]
    fn test_summary_upsert_keeps_created_at() {
        let store = store();
        store.upsert_summary("42", "first").unwrap();
        let first = store.get_summary("42").unwrap().unwrap();
        store.upsert_summary("42", "second").unwrap();
        let second = store.get_summary("42").unwrap().unwrap();
        assert_eq!(second.summary, "second");
        assert_eq!(second.created_at, first.created_at);
        assert!(store.delete_summary("42").unwrap());
        assert_eq!(store.get_summary("42").unwrap(), None);
    }

    #[test]
    fn test_receipt_roundtrip() {
        let store = store();
        let mut session = InterviewSession::new("42");
        session.finalize("summary").unwrap();
        let receipt = FinalizationReceipt::for_session(&session).unwrap();
        store.put_receipt(&receipt, TTL).unwrap();
        let loaded = store.get_receipt(session.session_id()).unwrap().unwrap();
        assert_eq!(loaded.final_summary, "summary");
        assert_eq!(loaded.user_id, "42");
    }
}
