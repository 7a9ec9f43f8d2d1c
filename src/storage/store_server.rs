// src/storage/store_server.rs — Async message passing for Store

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::infra::errors::WinearError;
use crate::interview::{
    FinalizationReceipt, InterviewSession, ProfileRepository, SessionStore, UserProfileSummary,
};
use crate::storage::store::Store;

type Reply<T> = oneshot::Sender<Result<T, WinearError>>;

#[derive(Debug)]
pub enum StoreCommand {
    GetSession {
        id: String,
        resp: Reply<Option<InterviewSession>>,
    },
    PutSession {
        session: Box<InterviewSession>,
        expected_version: Option<u64>,
        ttl: Duration,
        resp: Reply<()>,
    },
    DeleteSession {
        id: String,
        resp: Reply<()>,
    },
    PutReceipt {
        receipt: FinalizationReceipt,
        ttl: Duration,
        resp: Reply<()>,
    },
    GetReceipt {
        session_id: String,
        resp: Reply<Option<FinalizationReceipt>>,
    },
    PurgeExpired {
        resp: Reply<usize>,
    },
    UpsertSummary {
        user_id: String,
        summary: String,
        resp: Reply<()>,
    },
    GetSummary {
        user_id: String,
        resp: Reply<Option<UserProfileSummary>>,
    },
    DeleteSummary {
        user_id: String,
        resp: Reply<bool>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> Result<T, WinearError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(build(resp_tx))
            .await
            .map_err(|_| WinearError::StoreUnavailable("store server is not running".into()))?;
        let result = resp_rx
            .await
            .map_err(|_| WinearError::StoreUnavailable("store server dropped the request".into()))?;
        result.map_err(|e| match e {
            WinearError::Database(e) => WinearError::StoreUnavailable(e.to_string()),
            other => other,
        })
    }
}

#[async_trait]
impl SessionStore for StoreHandle {
    async fn get(&self, session_id: &str) -> Result<Option<InterviewSession>, WinearError> {
        let id = session_id.to_string();
        self.call(|resp| StoreCommand::GetSession { id, resp }).await
    }

    async fn put(
        &self,
        session: &InterviewSession,
        expected_version: Option<u64>,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        let session = Box::new(session.clone());
        self.call(|resp| StoreCommand::PutSession {
            session,
            expected_version,
            ttl,
            resp,
        })
        .await
    }

    async fn delete(&self, session_id: &str) -> Result<(), WinearError> {
        let id = session_id.to_string();
        self.call(|resp| StoreCommand::DeleteSession { id, resp })
            .await
    }

    async fn put_receipt(
        &self,
        receipt: &FinalizationReceipt,
        ttl: Duration,
    ) -> Result<(), WinearError> {
        let receipt = receipt.clone();
        self.call(|resp| StoreCommand::PutReceipt { receipt, ttl, resp })
            .await
    }

    async fn get_receipt(
        &self,
        session_id: &str,
    ) -> Result<Option<FinalizationReceipt>, WinearError> {
        let session_id = session_id.to_string();
        self.call(|resp| StoreCommand::GetReceipt { session_id, resp })
            .await
    }

    async fn purge_expired(&self) -> Result<usize, WinearError> {
        self.call(|resp| StoreCommand::PurgeExpired { resp }).await
    }
}

#[async_trait]
impl ProfileRepository for StoreHandle {
    async fn upsert(&self, user_id: &str, summary: &str) -> Result<(), WinearError> {
        let user_id = user_id.to_string();
        let summary = summary.to_string();
        self.call(|resp| StoreCommand::UpsertSummary {
            user_id,
            summary,
            resp,
        })
        .await
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserProfileSummary>, WinearError> {
        let user_id = user_id.to_string();
        self.call(|resp| StoreCommand::GetSummary { user_id, resp })
            .await
    }

    async fn delete(&self, user_id: &str) -> Result<bool, WinearError> {
        let user_id = user_id.to_string();
        self.call(|resp| StoreCommand::DeleteSummary { user_id, resp })
            .await
    }
}

/// Spawn the store server in a background task.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::GetSession { id, resp } => {
                let _ = resp.send(store.get_session(&id));
            }
            StoreCommand::PutSession {
                session,
                expected_version,
                ttl,
                resp,
            } => {
                let _ = resp.send(store.put_session(&session, expected_version, ttl));
            }
            StoreCommand::DeleteSession { id, resp } => {
                let _ = resp.send(store.delete_session(&id));
            }
            StoreCommand::PutReceipt { receipt, ttl, resp } => {
                let _ = resp.send(store.put_receipt(&receipt, ttl));
            }
            StoreCommand::GetReceipt { session_id, resp } => {
                let _ = resp.send(store.get_receipt(&session_id));
            }
            StoreCommand::PurgeExpired { resp } => {
                let res = store.purge_expired();
                if let Ok(n) = &res {
                    if *n > 0 {
                        tracing::debug!(rows = *n, "Purged expired session rows");
                    }
                }
                let _ = resp.send(res);
            }
            StoreCommand::UpsertSummary {
                user_id,
                summary,
                resp,
            } => {
                let _ = resp.send(store.upsert_summary(&user_id, &summary));
            }
            StoreCommand::GetSummary { user_id, resp } => {
                let _ = resp.send(store.get_summary(&user_id));
            }
            StoreCommand::DeleteSummary { user_id, resp } => {
                let _ = resp.send(store.delete_summary(&user_id));
            }
        }
    }
    tracing::debug!("Store server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[tokio::test]
    async fn test_handle_serves_both_traits() {
        let (handle, _join) = Database::in_memory().unwrap().spawn();
        let session = InterviewSession::new("42");

        SessionStore::put(&handle, &session, None, Duration::from_secs(60))
            .await
            .unwrap();
        let loaded = SessionStore::get(&handle, session.session_id())
            .await
            .unwrap();
        assert_eq!(loaded, Some(session));

        ProfileRepository::upsert(&handle, "42", "summary").await.unwrap();
        let profile = ProfileRepository::get(&handle, "42").await.unwrap().unwrap();
        assert_eq!(profile.summary, "summary");
    }

    #[tokio::test]
    async fn test_stopped_server_is_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = StoreHandle::new(tx);
        let err = SessionStore::get(&handle, "x").await.unwrap_err();
        assert!(matches!(err, WinearError::StoreUnavailable(_)));
    }
}
