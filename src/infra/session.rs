//! Session shared by a unit of work and the repositories it hands out.
//!
//! The session owns the connection, the optional open transaction and the
//! change tracker. Store round-trips take the state lock for their whole
//! duration, so calls issued through one unit reach the store in program
//! order. The tracker lock is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use super::repositories::tracking::{ChangeTracker, PendingChange};
use crate::errors::{RepoError, RepoResult, StateViolation};

pub(crate) enum SessionState {
    Idle,
    InTransaction(DatabaseTransaction),
    Disposed,
}

/// Observable lifecycle state of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    InTransaction,
    Disposed,
}

impl From<&SessionState> for TransactionState {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Idle => TransactionState::Idle,
            SessionState::InTransaction(_) => TransactionState::InTransaction,
            SessionState::Disposed => TransactionState::Disposed,
        }
    }
}

pub(crate) struct Session {
    pub(crate) connection: DatabaseConnection,
    pub(crate) state: tokio::sync::Mutex<SessionState>,
    tracker: Mutex<ChangeTracker>,
}

/// Run `$body` against the session's current connection: the open
/// transaction if there is one, the plain connection otherwise.
///
/// Returns `StateViolation::Disposed` from the enclosing function once the
/// session has been released.
macro_rules! on_session {
    ($session:expr, |$db:ident| $body:expr) => {{
        let state = $session.state.lock().await;
        match &*state {
            $crate::infra::session::SessionState::InTransaction($db) => $body,
            $crate::infra::session::SessionState::Idle => {
                let $db = &$session.connection;
                $body
            }
            $crate::infra::session::SessionState::Disposed => {
                return Err($crate::errors::StateViolation::Disposed.into());
            }
        }
    }};
}

pub(crate) use on_session;

impl Session {
    pub(crate) fn new(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            state: tokio::sync::Mutex::new(SessionState::Idle),
            tracker: Mutex::new(ChangeTracker::default()),
        }
    }

    pub(crate) fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn ensure_open(&self) -> RepoResult<()> {
        match *self.state.lock().await {
            SessionState::Disposed => Err(StateViolation::Disposed.into()),
            _ => Ok(()),
        }
    }

    pub(crate) fn stage(&self, change: Box<dyn PendingChange>) {
        tracing::debug!(change = %change.describe(), "Staged change");
        self.tracker().stage(change);
    }

    /// Write every staged change to the store, in staging order.
    ///
    /// The writes run in a nested transaction of the open one, or in a
    /// short-lived transaction when idle, so a failure leaves the store as
    /// it was before the flush. Failed changes stay queued.
    pub(crate) async fn flush(&self) -> RepoResult<u64> {
        let state = self.state.lock().await;
        if let SessionState::Disposed = &*state {
            return Err(StateViolation::Disposed.into());
        }

        let pending_len = self.tracker().pending_len();
        if pending_len == 0 {
            return Ok(0);
        }

        let scope = match &*state {
            SessionState::InTransaction(txn) => txn.begin().await?,
            _ => self.connection.begin().await?,
        };

        let mut pending = self.tracker().take_pending();
        match apply_all(&scope, &mut pending).await {
            Ok(rows) => match scope.commit().await {
                Ok(()) => {
                    let mut tracker = self.tracker();
                    for change in pending.iter_mut() {
                        change.settle(&mut tracker);
                    }
                    tracing::debug!(changes = pending.len(), rows, "Flushed staged changes");
                    Ok(rows)
                }
                Err(e) => {
                    self.tracker().requeue(pending);
                    Err(RepoError::from(e))
                }
            },
            Err(e) => {
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!("Flush rollback failed: {}", rollback_err);
                }
                self.tracker().requeue(pending);
                Err(e)
            }
        }
    }
}

async fn apply_all(
    txn: &DatabaseTransaction,
    changes: &mut [Box<dyn PendingChange>],
) -> RepoResult<u64> {
    let mut rows = 0;
    for change in changes.iter_mut() {
        rows += change.apply(txn).await.map_err(|e| {
            tracing::debug!(change = %change.describe(), "Staged change failed: {}", e);
            RepoError::from(e)
        })?;
    }
    Ok(rows)
}
