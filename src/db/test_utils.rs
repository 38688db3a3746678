//! Shared fixtures: sqlite files standing in for the two databases.

use std::time::Duration;

use tempfile::TempDir;

use crate::db::{BindingRegistry, ConnectionConfig, DatabaseBinding};

pub(crate) const WEB_PATTERN: &str = "puml::web";
pub(crate) const SERVICE_PATTERN: &str = "puml::service::*::mapper";

/// A sqlite database file inside `dir`.
pub(crate) fn sqlite_config(dir: &TempDir, name: &str) -> ConnectionConfig {
    ConnectionConfig::sqlite(dir.path().join(format!("{name}.db")).display().to_string())
}

/// Sqlite config with a single connection and a short acquire timeout.
pub(crate) fn single_connection_config(dir: &TempDir, name: &str) -> ConnectionConfig {
    sqlite_config(dir, name).with_pool_limits(1, Duration::from_millis(200))
}

/// Registry with `web` and `service` bindings on separate sqlite files.
pub(crate) fn dual_registry(dir: &TempDir) -> BindingRegistry {
    let mut registry = BindingRegistry::new();
    registry
        .register("web", WEB_PATTERN, sqlite_config(dir, "web"))
        .expect("register web binding");
    registry
        .register("service", SERVICE_PATTERN, sqlite_config(dir, "service"))
        .expect("register service binding");
    registry
}

/// Run setup statements directly on a binding's pool.
pub(crate) async fn seed(binding: &DatabaseBinding, statements: &[&str]) {
    let pool = binding.pool().await.expect("pool should connect");
    for statement in statements {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .unwrap_or_else(|e| panic!("seed statement {statement:?} failed: {e}"));
    }
}

/// Count rows of `table` directly on a binding's pool.
pub(crate) async fn count_rows(binding: &DatabaseBinding, table: &str) -> i64 {
    let pool = binding.pool().await.expect("pool should connect");
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&pool)
        .await
        .expect("count query should succeed")
}
