//! Registry mapping namespace patterns to database bindings.
//!
//! Built once at startup. After construction it is only read, so it can be
//! shared behind an `Arc` by every request.

use std::sync::Arc;

use tracing::{info, instrument};

use super::binding::{ConnectionConfig, DatabaseBinding};
use super::namespace::NamespacePattern;
use super::transaction::Propagation;
use super::unit::{BoundUnit, DataAccessUnit};
use crate::db::{DbError, DbResult};

/// All bindings known to the process.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Arc<DatabaseBinding>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding with the default propagation.
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        config: ConnectionConfig,
    ) -> DbResult<Arc<DatabaseBinding>> {
        self.register_with(name, pattern, config, Propagation::default())
    }

    /// Register a binding.
    ///
    /// Fails with `Configuration` when the name is taken, the connection
    /// configuration is invalid, or the pattern is ambiguous with an existing
    /// one (identical, or crossing so that neither is more specific).
    pub fn register_with(
        &mut self,
        name: &str,
        pattern: &str,
        config: ConnectionConfig,
        propagation: Propagation,
    ) -> DbResult<Arc<DatabaseBinding>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Configuration {
                message: "binding name must not be empty".to_string(),
            });
        }
        if self.get(name).is_some() {
            return Err(DbError::Configuration {
                message: format!("binding '{name}' is already registered"),
            });
        }

        let pattern = NamespacePattern::parse(pattern)?;
        if let Some(existing) = self
            .bindings
            .iter()
            .find(|b| b.pattern().is_ambiguous_with(&pattern))
        {
            return Err(DbError::Configuration {
                message: format!(
                    "namespace pattern '{}' for binding '{}' overlaps pattern '{}' of binding '{}'",
                    pattern,
                    name,
                    existing.pattern(),
                    existing.name()
                ),
            });
        }

        config.validate().map_err(|e| match e {
            DbError::Configuration { message } => DbError::Configuration {
                message: format!("binding '{name}': {message}"),
            },
            other => other,
        })?;

        info!(
            binding = name,
            pattern = %pattern,
            target = %config.redacted(),
            "database binding registered"
        );
        let binding = Arc::new(DatabaseBinding::new(name, pattern, config, propagation));
        self.bindings.push(Arc::clone(&binding));
        Ok(binding)
    }

    /// Find the most specific binding whose pattern covers the unit.
    pub fn resolve(&self, unit: &DataAccessUnit) -> DbResult<Arc<DatabaseBinding>> {
        self.bindings
            .iter()
            .filter(|b| b.pattern().matches(unit.namespace()))
            .max_by_key(|b| b.pattern().specificity())
            .cloned()
            .ok_or_else(|| DbError::UnresolvedBinding {
                namespace: unit.namespace().to_string(),
                unit: unit.name().to_string(),
            })
    }

    /// Resolve a unit once and pin it to its binding.
    pub fn bind(&self, unit: DataAccessUnit) -> DbResult<BoundUnit> {
        let binding = self.resolve(&unit)?;
        info!(
            unit = unit.name(),
            namespace = unit.namespace(),
            binding = binding.name(),
            "data access unit bound"
        );
        Ok(BoundUnit::new(unit, binding))
    }

    pub fn get(&self, name: &str) -> Option<Arc<DatabaseBinding>> {
        self.bindings.iter().find(|b| b.name() == name).cloned()
    }

    /// Look up a binding that the application requires to exist.
    pub fn require(&self, name: &str) -> DbResult<Arc<DatabaseBinding>> {
        self.get(name).ok_or_else(|| DbError::Configuration {
            message: format!("required binding '{name}' is not registered"),
        })
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Arc<DatabaseBinding>> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Create every pool and check it answers, so that an unreachable
    /// database stops the process before any request is served.
    #[instrument(skip(self))]
    pub async fn connect_all(&self) -> DbResult<()> {
        for binding in &self.bindings {
            let pool = binding.pool().await?;
            sqlx::query("SELECT 1")
                .execute(&pool)
                .await
                .map_err(|e| DbError::Connection {
                    binding: binding.name().to_string(),
                    message: e.to_string(),
                })?;
            info!(binding = binding.name(), "database reachable");
        }
        Ok(())
    }

    pub async fn close_all(&self) {
        for binding in &self.bindings {
            binding.lazy_pool().close().await;
        }
    }
}
