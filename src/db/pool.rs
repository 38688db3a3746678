//! Per-binding connection pool, created at most once per process.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tokio::sync::OnceCell;
use tracing::info;

use super::binding::ConnectionConfig;
use crate::db::{DbError, DbResult};

/// Pool that connects on first use and is never rebuilt afterwards.
pub(crate) struct LazyPool {
    binding: Arc<str>,
    config: ConnectionConfig,
    cell: OnceCell<AnyPool>,
    created: AtomicUsize,
}

impl LazyPool {
    pub(crate) fn new(binding: Arc<str>, config: ConnectionConfig) -> Self {
        Self {
            binding,
            config,
            cell: OnceCell::new(),
            created: AtomicUsize::new(0),
        }
    }

    pub(crate) fn binding(&self) -> &Arc<str> {
        &self.binding
    }

    /// Return the pool, connecting if this is the first call.
    ///
    /// Concurrent first calls wait on a single connect attempt. A failed
    /// attempt leaves the cell empty.
    pub(crate) async fn get(&self) -> DbResult<AnyPool> {
        let pool = self.cell.get_or_try_init(|| self.connect()).await?;
        Ok(pool.clone())
    }

    async fn connect(&self) -> DbResult<AnyPool> {
        sqlx::any::install_default_drivers();
        let url = self.config.connect_url()?;
        let pool = AnyPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(self.config.min_connections)
            .acquire_timeout(self.config.acquire_timeout())
            .connect(&url)
            .await
            .map_err(|e| DbError::Connection {
                binding: self.binding.to_string(),
                message: e.to_string(),
            })?;

        self.created.fetch_add(1, Ordering::Relaxed);
        info!(
            binding = %self.binding,
            target = %self.config.redacted(),
            max_connections = self.config.max_connections,
            "connection pool created"
        );
        Ok(pool)
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// How many pools have been built for this binding. Never exceeds one.
    #[cfg(test)]
    pub(crate) fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub(crate) async fn close(&self) {
        if let Some(pool) = self.cell.get() {
            pool.close().await;
            info!(binding = %self.binding, "connection pool closed");
        }
    }
}
