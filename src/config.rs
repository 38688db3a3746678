//! Application configuration.
//!
//! Values come from an optional YAML file, then `APP_*` environment
//! variables, then CLI flags applied by the binary through the `with_*`
//! builders.

use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::{ConnectionConfig, DatabaseKind, DbError, DbResult, Propagation};

/// Binding name for the web layer database.
pub const WEB_BINDING: &str = "web";
/// Binding name for the service layer database.
pub const SERVICE_BINDING: &str = "service";

/// Namespace scanned for web layer mappers.
pub const DEFAULT_WEB_NAMESPACE: &str = "puml::web";
/// Namespace scanned for service layer mappers.
pub const DEFAULT_SERVICE_NAMESPACE: &str = "puml::service::*::mapper";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub datasources: DataSources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Upper bound on a single request, including any open transaction.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// The two named connection configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSources {
    #[serde(default = "DataSourceConfig::web")]
    pub web: DataSourceConfig,
    #[serde(default = "DataSourceConfig::service")]
    pub service: DataSourceConfig,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            web: DataSourceConfig::web(),
            service: DataSourceConfig::service(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Namespace pattern owned by this datasource. Falls back to the
    /// datasource's scan path when unset.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub propagation: Propagation,
    pub connection: ConnectionConfig,
}

impl DataSourceConfig {
    fn web() -> Self {
        Self {
            namespace: None,
            propagation: Propagation::default(),
            connection: ConnectionConfig {
                kind: DatabaseKind::Mysql,
                database: "webdb".to_string(),
                ..ConnectionConfig::default()
            },
        }
    }

    fn service() -> Self {
        Self {
            namespace: None,
            propagation: Propagation::default(),
            connection: ConnectionConfig {
                kind: DatabaseKind::Postgres,
                database: "servicedb".to_string(),
                ..ConnectionConfig::default()
            },
        }
    }

    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

impl AppConfig {
    /// Load from an optional YAML file and apply environment overrides.
    pub fn load(path: Option<&Path>) -> DbResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DbError::Configuration {
            message: format!("cannot read config file {}: {e}", path.display()),
        })?;
        Self::from_yaml(&contents).map_err(|e| match e {
            DbError::Configuration { message } => DbError::Configuration {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn from_yaml(contents: &str) -> DbResult<Self> {
        // An empty document means "all defaults".
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| DbError::Configuration {
            message: format!("invalid config: {e}"),
        })
    }

    /// Override fields from `APP_*` variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> DbResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("APP_SERVER_HOST") {
            self.server.host = parse_var("APP_SERVER_HOST", &host)?;
        }
        if let Some(port) = lookup("APP_SERVER_PORT") {
            self.server.port = parse_var("APP_SERVER_PORT", &port)?;
        }
        if let Some(timeout) = lookup("APP_SERVER_REQUEST_TIMEOUT_MS") {
            self.server.request_timeout_ms = parse_var("APP_SERVER_REQUEST_TIMEOUT_MS", &timeout)?;
        }

        self.datasources.web.apply_env("APP_DATASOURCE_WEB", &lookup)?;
        self.datasources
            .service
            .apply_env("APP_DATASOURCE_SERVICE", &lookup)?;
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.server.request_timeout_ms == 0 {
            return Err(DbError::Configuration {
                message: "server.request_timeout_ms must be greater than zero".to_string(),
            });
        }
        for (name, datasource) in [
            (WEB_BINDING, &self.datasources.web),
            (SERVICE_BINDING, &self.datasources.service),
        ] {
            datasource.connection.validate().map_err(|e| match e {
                DbError::Configuration { message } => DbError::Configuration {
                    message: format!("datasource '{name}': {message}"),
                },
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.server.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }
}

impl DataSourceConfig {
    fn apply_env<F>(&mut self, prefix: &str, lookup: &F) -> DbResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let key = format!("{prefix}_{suffix}");
            lookup(&key).map(|value| (key, value))
        };
        let connection = &mut self.connection;

        if let Some((_, namespace)) = var("NAMESPACE") {
            self.namespace = Some(namespace);
        }
        if let Some((key, kind)) = var("KIND") {
            connection.kind = parse_var(&key, &kind)?;
        }
        if let Some((_, url)) = var("URL") {
            connection.url = Some(url);
        }
        if let Some((_, host)) = var("HOST") {
            connection.host = host;
        }
        if let Some((key, port)) = var("PORT") {
            connection.port = Some(parse_var(&key, &port)?);
        }
        if let Some((_, database)) = var("DATABASE") {
            connection.database = database;
        }
        if let Some((_, username)) = var("USERNAME") {
            connection.username = Some(username);
        }
        if let Some((_, password)) = var("PASSWORD") {
            connection.password = Some(password);
        }
        if let Some((key, max)) = var("MAX_CONNECTIONS") {
            connection.max_connections = parse_var(&key, &max)?;
        }
        if let Some((key, min)) = var("MIN_CONNECTIONS") {
            connection.min_connections = parse_var(&key, &min)?;
        }
        if let Some((key, timeout)) = var("ACQUIRE_TIMEOUT_MS") {
            connection.acquire_timeout_ms = parse_var(&key, &timeout)?;
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> DbResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| DbError::Configuration {
        message: format!("{key}='{value}': {e}"),
    })
}
