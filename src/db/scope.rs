use super::{Database, Session, SessionError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_SCOPE: ScopeToken;
}

/// Opaque identifier of one request scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken(Uuid);

impl ScopeToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Token of the scope active in the calling task, if any.
pub fn current_token() -> Option<ScopeToken> {
    CURRENT_SCOPE.try_with(|token| *token).ok()
}

/// Owns the registration of one session. [`ScopeGuard::end`] releases it
/// explicitly; dropping the guard without calling `end` (panic, cancellation)
/// still unregisters the session and returns its connection to the pool.
#[must_use = "dropping the guard ends the scope immediately"]
pub struct ScopeGuard {
    db: Database,
    token: ScopeToken,
    session: Option<Arc<Session>>,
}

impl ScopeGuard {
    pub fn token(&self) -> ScopeToken {
        self.token
    }

    /// Unregisters the session and rolls back whatever it did not commit.
    /// A failing rollback is logged, never returned.
    pub async fn end(mut self) {
        if let Some(session) = self.session.take() {
            self.db.unregister(self.token);
            if let Err(e) = session.close().await {
                tracing::warn!(scope = %self.token, "failed to release session: {}", e);
            }
            tracing::trace!(scope = %self.token, "request scope ended");
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.db.unregister(self.token);
            session.abandon();
            tracing::debug!(scope = %self.token, "request scope abandoned");
        }
    }
}

impl Database {
    /// Registers a new session under a fresh token. The token is not bound to the
    /// calling task; use [`Database::scope`] for that.
    pub fn scope_begin(&self) -> ScopeGuard {
        let mut sessions = self.sessions();
        let token = loop {
            let candidate = ScopeToken::generate();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = Arc::new(Session::new(token, self.pool().clone()));
        sessions.insert(token, Arc::clone(&session));
        drop(sessions);
        tracing::trace!(scope = %token, "request scope started");
        ScopeGuard {
            db: self.clone(),
            token,
            session: Some(session),
        }
    }

    /// Runs `fut` inside a new request scope and releases the scope's session on
    /// every exit path.
    ///
    /// Opening a scope while one is already active in the same task is a
    /// programming error and fails with [`SessionError::ScopeAlreadyActive`].
    pub async fn scope<F>(&self, fut: F) -> Result<F::Output, SessionError>
    where
        F: Future,
    {
        if let Some(active) = current_token() {
            tracing::error!(scope = %active, "request scope opened inside an active scope");
            return Err(SessionError::ScopeAlreadyActive(active));
        }
        let guard = self.scope_begin();
        let output = CURRENT_SCOPE.scope(guard.token(), fut).await;
        guard.end().await;
        Ok(output)
    }

    fn unregister(&self, token: ScopeToken) {
        self.sessions().remove(&token);
    }
}
