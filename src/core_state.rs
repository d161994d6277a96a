//! Shared application state handed to every request handler.
//!
//! Holds the single SQLite connection behind a `Mutex`. Handlers lock it
//! only around synchronous database work and never across an `.await`.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::Config;
use crate::db;

pub struct CoreState {
    conn: Mutex<Connection>,
    pub config: Config,
}

impl CoreState {
    /// Open (and migrate) the database named in `config`.
    pub fn open(config: Config) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.db_path)?;
        Ok(Self::with_connection(conn, config))
    }

    pub fn with_connection(conn: Connection, config: Config) -> Self {
        Self {
            conn: Mutex::new(conn),
            config,
        }
    }

    /// State over a fresh in-memory database.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self::with_connection(
            conn,
            Config::with_db_path(":memory:".into()),
        ))
    }

    /// Lock the database connection.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
