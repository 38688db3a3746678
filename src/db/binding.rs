//! Connection configuration and the binding that ties a namespace to one
//! physical database.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use url::Url;

use super::namespace::NamespacePattern;
use super::pool::LazyPool;
use super::transaction::{Propagation, TransactionManager};
use crate::db::{DbError, DbResult};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    Sqlite,
}

impl DatabaseKind {
    fn scheme(self) -> &'static str {
        match self {
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Sqlite => "sqlite",
        }
    }

    fn default_port(self) -> Option<u16> {
        match self {
            DatabaseKind::Mysql => Some(3306),
            DatabaseKind::Postgres => Some(5432),
            DatabaseKind::Sqlite => None,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl std::str::FromStr for DatabaseKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseKind::Postgres),
            "sqlite" => Ok(DatabaseKind::Sqlite),
            other => Err(DbError::Configuration {
                message: format!("unknown database kind '{other}'"),
            }),
        }
    }
}

/// Connection parameters and pool limits for one database.
///
/// Either `url` is given, or it is assembled from the individual fields.
/// For sqlite, `database` is the file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub kind: DatabaseKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    30_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: DatabaseKind::Postgres,
            url: None,
            host: default_host(),
            port: None,
            database: String::new(),
            username: None,
            password: None,
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl ConnectionConfig {
    /// Sqlite file database, created on first connect.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            host: String::new(),
            database: path.into(),
            ..Self::default()
        }
    }

    pub fn with_pool_limits(mut self, max_connections: u32, acquire_timeout: Duration) -> Self {
        self.max_connections = max_connections;
        self.acquire_timeout_ms = u64::try_from(acquire_timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Check pool limits and connection fields.
    pub fn validate(&self) -> DbResult<()> {
        let invalid = |message: String| Err(DbError::Configuration { message });

        if self.max_connections == 0 {
            return invalid("max_connections must be at least 1".to_string());
        }
        if self.min_connections > self.max_connections {
            return invalid(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return invalid("acquire_timeout_ms must be greater than zero".to_string());
        }
        if self.url.is_some() {
            return self.connect_url().map(|_| ());
        }
        if self.database.trim().is_empty() {
            return invalid(format!("{} connection requires a database", self.kind));
        }
        if self.kind != DatabaseKind::Sqlite && self.host.trim().is_empty() {
            return invalid(format!("{} connection requires a host", self.kind));
        }
        Ok(())
    }

    /// The URL handed to the driver.
    pub fn connect_url(&self) -> DbResult<String> {
        if let Some(url) = &self.url {
            let parsed = Url::parse(url).map_err(|e| DbError::Configuration {
                message: format!("invalid connection url: {e}"),
            })?;
            if parsed.scheme() != self.kind.scheme()
                && !(self.kind == DatabaseKind::Postgres && parsed.scheme() == "postgresql")
            {
                return Err(DbError::Configuration {
                    message: format!(
                        "connection url scheme '{}' does not match kind '{}'",
                        parsed.scheme(),
                        self.kind
                    ),
                });
            }
            return Ok(url.clone());
        }

        if self.kind == DatabaseKind::Sqlite {
            return Ok(format!("sqlite://{}?mode=rwc", self.database));
        }

        let mut url = Url::parse(&format!("{}://{}", self.kind.scheme(), self.host.trim()))
            .map_err(|e| DbError::Configuration {
                message: format!("invalid host '{}': {e}", self.host),
            })?;
        let configuration_error = |what: &str| DbError::Configuration {
            message: format!("cannot set {what} on {} url", self.kind),
        };
        url.set_port(self.port.or(self.kind.default_port()))
            .map_err(|_| configuration_error("port"))?;
        if let Some(username) = &self.username {
            url.set_username(username)
                .map_err(|_| configuration_error("username"))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| configuration_error("password"))?;
        }
        url.set_path(self.database.trim());
        Ok(url.into())
    }

    /// Connection target without credentials, for logs.
    pub fn redacted(&self) -> String {
        match (&self.url, self.kind) {
            (Some(url), _) => match Url::parse(url) {
                Ok(mut parsed) => {
                    let _ = parsed.set_password(None);
                    parsed.into()
                }
                Err(_) => format!("{}://<invalid>", self.kind),
            },
            (None, DatabaseKind::Sqlite) => format!("sqlite://{}", self.database),
            (None, kind) => format!(
                "{}://{}:{}/{}",
                kind,
                self.host,
                self.port.or(kind.default_port()).unwrap_or_default(),
                self.database
            ),
        }
    }
}

/// One physical database bound to a namespace pattern.
///
/// Owns exactly one pool and exactly one transaction manager.
pub struct DatabaseBinding {
    name: Arc<str>,
    pattern: NamespacePattern,
    config: ConnectionConfig,
    pool: Arc<LazyPool>,
    transactions: TransactionManager,
}

impl DatabaseBinding {
    pub(crate) fn new(
        name: &str,
        pattern: NamespacePattern,
        config: ConnectionConfig,
        propagation: Propagation,
    ) -> Self {
        let name: Arc<str> = Arc::from(name);
        let pool = Arc::new(LazyPool::new(Arc::clone(&name), config.clone()));
        let transactions = TransactionManager::new(Arc::clone(&pool), propagation);
        Self {
            name,
            pattern,
            config,
            pool,
            transactions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &NamespacePattern {
        &self.pattern
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn kind(&self) -> DatabaseKind {
        self.config.kind
    }

    /// The binding's pool, created on first use.
    pub async fn pool(&self) -> DbResult<AnyPool> {
        self.pool.get().await
    }

    pub(crate) fn lazy_pool(&self) -> &Arc<LazyPool> {
        &self.pool
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }
}

impl fmt::Debug for DatabaseBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseBinding")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("target", &self.config.redacted())
            .finish()
    }
}
