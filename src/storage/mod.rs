// src/storage/mod.rs — SQLite persistence for sessions and user summaries

pub mod schema;
pub mod store;
pub mod store_server;

use rusqlite::Connection;
use std::path::Path;

pub use store_server::StoreHandle;

/// Owns the SQLite connection until it is handed to the store server.
pub struct Database {
    pub store: store::Store,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL lets several server processes share one file.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA busy_timeout=5000;")?;

        schema::run_migrations(&conn)?;

        Ok(Self {
            store: store::Store::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            store: store::Store::new(conn),
        })
    }

    /// Move the connection into a background task and return its handle.
    pub fn spawn(self) -> (StoreHandle, tokio::task::JoinHandle<()>) {
        store_server::spawn_store_server(self.store)
    }
}
