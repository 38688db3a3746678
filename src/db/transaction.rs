//! Transaction scopes, one manager per binding.
//!
//! A [`TransactionScope`] wraps one physical transaction on one binding and
//! is owned by the call that opened it. Scopes on different bindings are
//! unrelated: there is no cross-database commit.
//!
//! [`CallScopes`] records which bindings already have an open scope within a
//! single inbound call, so that a second `begin` on the same binding is
//! rejected unless the binding allows [`Propagation::RequiresNew`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::{Any, AnyConnection, Transaction};
use tracing::{debug, warn};

use super::pool::LazyPool;
use crate::db::{DbError, DbResult};

/// What `begin` does when the same call already holds a scope on the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Propagation {
    /// Fail with `TransactionState`.
    #[default]
    Reject,
    /// Open an independent physical transaction on another connection.
    RequiresNew,
}

/// Lifecycle of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Committed,
    RolledBack,
}

type ActiveScopes = Arc<Mutex<HashMap<Arc<str>, usize>>>;

/// Open scopes of one inbound call, keyed by binding name.
///
/// Create one per request and pass it down by reference. It is deliberately
/// not `Clone`.
#[derive(Debug, Default)]
pub struct CallScopes {
    active: ActiveScopes,
}

impl CallScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this call currently holds a scope on `binding`.
    pub fn is_active(&self, binding: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(binding)
            .is_some_and(|count| *count > 0)
    }

    fn try_enter(&self, binding: &Arc<str>, propagation: Propagation) -> Option<ScopeRegistration> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let count = active.entry(Arc::clone(binding)).or_insert(0);
        if *count > 0 && propagation == Propagation::Reject {
            return None;
        }
        *count += 1;
        Some(ScopeRegistration {
            active: Arc::clone(&self.active),
            binding: Arc::clone(binding),
        })
    }
}

/// Removes the binding from its [`CallScopes`] when the scope goes away.
struct ScopeRegistration {
    active: ActiveScopes,
    binding: Arc<str>,
}

impl Drop for ScopeRegistration {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = active.get_mut(&self.binding) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                active.remove(&self.binding);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

/// Snapshot of a manager's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

/// Opens transaction scopes against a single binding's pool.
pub struct TransactionManager {
    pool: Arc<LazyPool>,
    propagation: Propagation,
    counters: Arc<Counters>,
}

impl TransactionManager {
    pub(crate) fn new(pool: Arc<LazyPool>, propagation: Propagation) -> Self {
        Self {
            pool,
            propagation,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn binding(&self) -> &str {
        self.pool.binding()
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// Begin a scope on this manager's binding for the call tracked by `calls`.
    pub async fn begin(&self, calls: &CallScopes) -> DbResult<TransactionScope> {
        let binding = self.pool.binding();
        let registration =
            calls
                .try_enter(binding, self.propagation)
                .ok_or_else(|| DbError::TransactionState {
                    binding: binding.to_string(),
                    message: "a transaction scope is already active for this call".to_string(),
                })?;

        let tx = self
            .pool
            .get()
            .await?
            .begin()
            .await
            .map_err(|e| DbError::from_sqlx(binding, "begin", e))?;

        self.counters.begun.fetch_add(1, Ordering::Relaxed);
        debug!(binding = %binding, "transaction scope opened");

        Ok(TransactionScope {
            binding: Arc::clone(binding),
            pool: Arc::clone(&self.pool),
            tx: Some(tx),
            state: ScopeState::Active,
            counters: Arc::clone(&self.counters),
            _registration: registration,
        })
    }

    /// Run `work` inside a fresh scope: commit on `Ok`, roll back on `Err`.
    ///
    /// A panic or cancellation inside `work` drops the scope, which rolls
    /// the transaction back.
    pub async fn transactional<T, F>(&self, calls: &CallScopes, work: F) -> DbResult<T>
    where
        F: for<'s> FnOnce(&'s mut TransactionScope) -> BoxFuture<'s, DbResult<T>>,
    {
        let mut scope = self.begin(calls).await?;
        let result = work(&mut scope).await;
        scope.finish(result).await
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            begun: self.counters.begun.load(Ordering::Relaxed),
            committed: self.counters.committed.load(Ordering::Relaxed),
            rolled_back: self.counters.rolled_back.load(Ordering::Relaxed),
        }
    }
}

/// One open transaction on one binding.
pub struct TransactionScope {
    binding: Arc<str>,
    pool: Arc<LazyPool>,
    tx: Option<Transaction<'static, Any>>,
    state: ScopeState,
    counters: Arc<Counters>,
    _registration: ScopeRegistration,
}

impl TransactionScope {
    pub fn binding(&self) -> &str {
        &self.binding
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    /// Whether this scope was opened on exactly `pool`. Names are not
    /// compared, since separate registries may reuse a binding name.
    pub(crate) fn is_on(&self, pool: &Arc<LazyPool>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }

    pub(crate) fn connection(&mut self) -> DbResult<&mut AnyConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(DbError::TransactionState {
                binding: self.binding.to_string(),
                message: format!("scope is {:?}", self.state),
            }),
        }
    }

    pub async fn commit(mut self) -> DbResult<()> {
        let tx = self.take_active()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = ScopeState::Committed;
                self.counters.committed.fetch_add(1, Ordering::Relaxed);
                debug!(binding = %self.binding, "transaction committed");
                Ok(())
            }
            Err(e) => {
                self.state = ScopeState::RolledBack;
                self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
                warn!(binding = %self.binding, error = %e, "commit failed");
                Err(DbError::from_sqlx(&self.binding, "commit", e))
            }
        }
    }

    pub async fn rollback(mut self) -> DbResult<()> {
        let tx = self.take_active()?;
        self.state = ScopeState::RolledBack;
        self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
        warn!(binding = %self.binding, "transaction rolled back");
        tx.rollback()
            .await
            .map_err(|e| DbError::from_sqlx(&self.binding, "rollback", e))
    }

    /// Commit if `result` is `Ok`, otherwise roll back and return the
    /// original error.
    pub async fn finish<T>(self, result: DbResult<T>) -> DbResult<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let binding = Arc::clone(&self.binding);
                if let Err(rollback_err) = self.rollback().await {
                    warn!(binding = %binding, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn take_active(&mut self) -> DbResult<Transaction<'static, Any>> {
        self.tx.take().ok_or_else(|| DbError::TransactionState {
            binding: self.binding.to_string(),
            message: format!("scope is {:?}", self.state),
        })
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        // Dropping the sqlx transaction queues a rollback on its connection.
        if self.state == ScopeState::Active {
            self.state = ScopeState::RolledBack;
            self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
            warn!(binding = %self.binding, "transaction scope dropped while active, rolling back");
        }
    }
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("binding", &self.binding)
            .field("state", &self.state)
            .finish()
    }
}
