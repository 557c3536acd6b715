//! Database handle: the connection pool plus the registry of request-scoped sessions.
//!
//! Every HTTP request runs inside [`Database::scope`]. The scope binds a fresh
//! [`ScopeToken`] into task-local storage and registers one [`Session`] for it;
//! [`Database::current_session`] resolves that session from anywhere inside the
//! request without passing it through handler signatures. Task-local storage
//! follows the request future across `.await` points and worker threads, so two
//! concurrent requests never see each other's token.

mod scope;
mod session;

pub use scope::{current_token, ScopeGuard, ScopeToken};
pub use session::{Session, SessionConnection};

use crate::settings::DatabaseSettings;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no request scope is active in this task")]
    NoActiveScope,
    #[error("request scope {0} is already active in this task")]
    ScopeAlreadyActive(ScopeToken),
    #[error("no session registered for scope {0}")]
    UnknownScope(ScopeToken),
    #[error("session for scope {0} is closed")]
    Closed(ScopeToken),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Cheap-to-clone handle shared by every request.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    pool: SqlitePool,
    sessions: Mutex<HashMap<ScopeToken, Arc<Session>>>,
}

impl Database {
    /// Opens the pool described by `settings`. The SQLite file is created if missing
    /// and runs in WAL mode so readers do not block the writer.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let statement_level = if settings.echo {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Debug
        };
        let options = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(statement_level);
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        tracing::info!(
            url = %settings.url,
            max_connections = settings.max_connections,
            "database pool ready"
        );
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Resolves the session bound to the scope active in the calling task.
    pub fn current_session(&self) -> Result<Arc<Session>, SessionError> {
        let token = current_token().ok_or(SessionError::NoActiveScope)?;
        self.sessions()
            .get(&token)
            .cloned()
            .ok_or(SessionError::UnknownScope(token))
    }

    /// Number of sessions currently registered. Zero whenever no request is in flight.
    pub fn active_scopes(&self) -> usize {
        self.sessions().len()
    }

    /// Closes the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.inner.pool.close().await;
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<ScopeToken, Arc<Session>>> {
        match self.inner.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Map operations cannot leave the registry half-updated.
                tracing::error!("session registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
