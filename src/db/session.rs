use super::{ScopeToken, SessionError};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{Sqlite, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

/// Exclusive access to a session's live connection, inside its open transaction.
pub type SessionConnection<'a> = MappedMutexGuard<'a, SqliteConnection>;

enum State {
    Idle,
    Active(Transaction<'static, Sqlite>),
    Closed,
}

/// Unit of work bound to one request scope.
///
/// The first call to [`Session::connection`] checks a connection out of the pool
/// and begins a transaction; later calls reuse it until [`Session::commit`] or
/// [`Session::rollback`]. Statements issued through one session run in the order
/// the caller awaits them.
pub struct Session {
    token: ScopeToken,
    pool: SqlitePool,
    state: Mutex<State>,
}

impl Session {
    pub(crate) fn new(token: ScopeToken, pool: SqlitePool) -> Self {
        Self {
            token,
            pool,
            state: Mutex::new(State::Idle),
        }
    }

    pub fn id(&self) -> ScopeToken {
        self.token
    }

    /// Checks out the session's connection, beginning a transaction on first use.
    ///
    /// The returned guard holds the session lock: drop it before calling
    /// [`Session::commit`] or [`Session::rollback`], which wait for that lock.
    pub async fn connection(&self) -> Result<SessionConnection<'_>, SessionError> {
        let mut state = self.state.lock().await;
        if matches!(*state, State::Closed) {
            return Err(SessionError::Closed(self.token));
        }
        if matches!(*state, State::Idle) {
            let tx = self.pool.begin().await?;
            tracing::trace!(scope = %self.token, "session transaction started");
            *state = State::Active(tx);
        }
        MutexGuard::try_map(state, |state| match state {
            State::Active(tx) => Some(&mut **tx),
            _ => None,
        })
        .map_err(|_| SessionError::Closed(self.token))
    }

    /// Commits the open transaction, if any. The next statement starts a new one.
    ///
    /// Waits for any outstanding [`SessionConnection`] guard to be dropped.
    pub async fn commit(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, State::Idle) {
            State::Active(tx) => {
                tx.commit().await?;
                tracing::trace!(scope = %self.token, "session committed");
                Ok(())
            }
            State::Idle => Ok(()),
            State::Closed => {
                *state = State::Closed;
                Err(SessionError::Closed(self.token))
            }
        }
    }

    /// Rolls back the open transaction, if any.
    ///
    /// Waits for any outstanding [`SessionConnection`] guard to be dropped.
    pub async fn rollback(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, State::Idle) {
            State::Active(tx) => {
                tx.rollback().await?;
                Ok(())
            }
            State::Idle => Ok(()),
            State::Closed => {
                *state = State::Closed;
                Err(SessionError::Closed(self.token))
            }
        }
    }

    /// Discards uncommitted work and returns the connection to the pool.
    pub(crate) async fn close(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if let State::Active(tx) = std::mem::replace(&mut *state, State::Closed) {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Synchronous variant of [`Session::close`] for drop paths. Dropping the
    /// transaction queues its rollback and hands the connection back to the pool.
    /// If the state is locked, the transaction goes with the last `Arc<Session>`.
    pub(crate) fn abandon(&self) {
        if let Ok(mut state) = self.state.try_lock() {
            *state = State::Closed;
        }
    }
}
