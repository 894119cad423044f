//! Unit of Work pattern implementation.
//!
//! The Unit of Work:
//! - Owns one session (connection, open transaction, change tracker)
//! - Hands out repositories that all share that session
//! - Manages the transaction lifecycle (begin, commit, rollback)
//! - Flushes staged writes to the store on save
//!
//! Lifecycle: `Idle -> begin -> InTransaction -> commit | roll_back -> Idle`.
//! Saves are valid in both states. Disposal is reachable from any state and
//! is terminal; an open transaction is rolled back, never committed.
//!
//! A unit is meant to be driven by one task at a time. Calls made through
//! it, and through its repositories, reach the store in program order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    AccessMode, DatabaseConnection, IntoActiveModel, IsolationLevel, TransactionTrait,
};

use super::repositories::GenericRepository;
use super::session::{Session, SessionState, TransactionState};
use crate::domain::BaseEntity;
use crate::errors::{RepoResult, StateViolation};

type RepositoryCache = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Unit of Work trait for dependency injection.
///
/// Hands out repositories and manages the transaction lifecycle.
/// Note: not object safe because of its generic methods; write code that
/// needs a unit of work as generic over `U: UnitOfWork`.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Repository for `E` bound to this unit's session.
    ///
    /// Built on first use; later calls return the same instance.
    fn repo<E>(&self) -> Arc<GenericRepository<E>>
    where
        E: BaseEntity,
        E::Model: Sync + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: Send;

    /// Current lifecycle state
    async fn state(&self) -> TransactionState;

    /// Number of staged writes not yet flushed
    fn pending_changes(&self) -> usize;

    /// Open the explicit transaction.
    async fn begin_transaction(&self) -> RepoResult<()>;

    /// Open the explicit transaction with an isolation level.
    ///
    /// Backends without isolation levels (SQLite) should use
    /// [`begin_transaction`](Self::begin_transaction).
    async fn begin_transaction_with(&self, isolation: IsolationLevel) -> RepoResult<()>;

    /// Commit the open transaction.
    ///
    /// Staged writes are not flushed by a commit; call
    /// [`save_changes`](Self::save_changes) first.
    async fn commit_transaction(&self) -> RepoResult<()>;

    /// Roll back the open transaction, discarding flushed and staged writes.
    async fn roll_back(&self) -> RepoResult<()>;

    /// Flush staged writes, failing with the store error if any write fails.
    async fn save_changes(&self) -> RepoResult<()>;

    /// Flush staged writes, reporting whether any row was affected.
    async fn save(&self) -> RepoResult<bool>;

    /// Run `f` inside a transaction.
    ///
    /// On `Ok` the staged writes are saved and the transaction committed;
    /// on `Err` everything is rolled back and the error returned.
    async fn transaction<F, T>(&self, f: F) -> RepoResult<T>
    where
        F: for<'a> FnOnce(&'a Self) -> BoxFuture<'a, RepoResult<T>> + Send,
        T: Send;
}

/// Concrete implementation of [`UnitOfWork`] owning one session.
pub struct Persistence {
    session: Arc<Session>,
    repositories: Mutex<RepositoryCache>,
}

impl Persistence {
    /// Create a unit over its own session on `connection`.
    pub fn new(connection: DatabaseConnection) -> Self {
        Self {
            session: Arc::new(Session::new(connection)),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// Release the session. An open transaction is rolled back.
    pub async fn dispose(self) -> RepoResult<()> {
        let previous = {
            let mut state = self.session.state.lock().await;
            std::mem::replace(&mut *state, SessionState::Disposed)
        };
        self.session.tracker().clear();
        self.repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        if let SessionState::InTransaction(txn) = previous {
            tracing::debug!("Disposing unit of work with an open transaction, rolling back");
            txn.rollback().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn repo<E>(&self) -> Arc<GenericRepository<E>>
    where
        E: BaseEntity,
        E::Model: Sync + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: Send,
    {
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cached = repositories
            .get(&TypeId::of::<E>())
            .cloned()
            .and_then(|repo| repo.downcast::<GenericRepository<E>>().ok());
        if let Some(repo) = cached {
            return repo;
        }

        let repo = Arc::new(GenericRepository::<E>::new(self.session.clone()));
        repositories.insert(TypeId::of::<E>(), repo.clone());
        repo
    }

    async fn state(&self) -> TransactionState {
        TransactionState::from(&*self.session.state.lock().await)
    }

    fn pending_changes(&self) -> usize {
        self.session.tracker().pending_len()
    }

    async fn begin_transaction(&self) -> RepoResult<()> {
        let mut state = self.session.state.lock().await;
        match &*state {
            SessionState::Idle => {}
            SessionState::InTransaction(_) => {
                return Err(StateViolation::TransactionAlreadyOpen.into())
            }
            SessionState::Disposed => return Err(StateViolation::Disposed.into()),
        }

        let txn = self.session.connection.begin().await?;
        *state = SessionState::InTransaction(txn);
        tracing::debug!("Transaction started");
        Ok(())
    }

    async fn begin_transaction_with(&self, isolation: IsolationLevel) -> RepoResult<()> {
        let mut state = self.session.state.lock().await;
        match &*state {
            SessionState::Idle => {}
            SessionState::InTransaction(_) => {
                return Err(StateViolation::TransactionAlreadyOpen.into())
            }
            SessionState::Disposed => return Err(StateViolation::Disposed.into()),
        }

        let txn = self
            .session
            .connection
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await?;
        *state = SessionState::InTransaction(txn);
        tracing::debug!(?isolation, "Transaction started");
        Ok(())
    }

    async fn commit_transaction(&self) -> RepoResult<()> {
        let mut state = self.session.state.lock().await;
        let txn = match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::InTransaction(txn) => txn,
            other => {
                let violation = match other {
                    SessionState::Disposed => StateViolation::Disposed,
                    _ => StateViolation::NoTransaction,
                };
                *state = other;
                return Err(violation.into());
            }
        };

        txn.commit().await?;

        let pending = self.session.tracker().pending_len();
        if pending > 0 {
            tracing::warn!(pending, "Transaction committed with unsaved staged changes");
        }
        tracing::debug!("Transaction committed");
        Ok(())
    }

    async fn roll_back(&self) -> RepoResult<()> {
        let mut state = self.session.state.lock().await;
        let txn = match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::InTransaction(txn) => txn,
            other => {
                let violation = match other {
                    SessionState::Disposed => StateViolation::Disposed,
                    _ => StateViolation::NoTransaction,
                };
                *state = other;
                return Err(violation.into());
            }
        };

        self.session.tracker().clear();
        txn.rollback().await?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    async fn save_changes(&self) -> RepoResult<()> {
        self.session.flush().await?;
        Ok(())
    }

    async fn save(&self) -> RepoResult<bool> {
        Ok(self.session.flush().await? > 0)
    }

    async fn transaction<F, T>(&self, f: F) -> RepoResult<T>
    where
        F: for<'a> FnOnce(&'a Self) -> BoxFuture<'a, RepoResult<T>> + Send,
        T: Send,
    {
        self.begin_transaction().await?;

        let outcome = match f(self).await {
            Ok(value) => self.save_changes().await.map(|()| value),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                self.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.roll_back().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

impl Drop for Persistence {
    fn drop(&mut self) {
        // Dropping an open SeaORM transaction rolls it back.
        if let Ok(mut state) = self.session.state.try_lock() {
            if let SessionState::InTransaction(_) = &*state {
                tracing::warn!("Unit of work dropped with an open transaction, rolling back");
            }
            *state = SessionState::Disposed;
        }
    }
}

/// Run a block inside [`UnitOfWork::transaction`].
///
/// ```ignore
/// with_transaction!(uow, |tx| {
///     tx.repo::<item::Entity>().add(item).await?;
///     Ok(())
/// })?;
/// ```
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$tx:ident| $body:expr) => {{
        use $crate::infra::UnitOfWork as _;
        $uow.transaction(|$tx| Box::pin(async move { $body })).await
    }};
}
