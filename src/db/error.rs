//! Database routing error types.
//!
//! Startup-class errors (`Configuration`, `UnresolvedBinding`, `Connection`)
//! abort process start. Per-call errors (`TransactionState`, `PoolExhausted`,
//! `DataAccess`) surface to the request handler unchanged; nothing here is
//! retried or recovered locally.

use miette::Diagnostic;
use thiserror::Error;

/// Database routing and execution errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    #[diagnostic(code(puml::db::configuration))]
    Configuration { message: String },

    #[error("No database binding matches namespace '{namespace}' (unit '{unit}')")]
    #[diagnostic(
        code(puml::db::unresolved_binding),
        help("register a namespace pattern that covers this module path")
    )]
    UnresolvedBinding { namespace: String, unit: String },

    #[error("Connection error on binding '{binding}': {message}")]
    #[diagnostic(code(puml::db::connection))]
    Connection { binding: String, message: String },

    #[error("Transaction state error on binding '{binding}': {message}")]
    #[diagnostic(code(puml::db::transaction_state))]
    TransactionState { binding: String, message: String },

    #[error("Connection pool exhausted on binding '{binding}'")]
    #[diagnostic(
        code(puml::db::pool_exhausted),
        help("the request may be retried once connections are released")
    )]
    PoolExhausted { binding: String },

    #[error("Data access error on binding '{binding}' ({operation}): {source}")]
    #[diagnostic(code(puml::db::data_access))]
    DataAccess {
        binding: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    /// Classify a driver error raised while working on `binding`.
    ///
    /// An acquire timeout becomes `PoolExhausted`; anything else is wrapped
    /// as `DataAccess`.
    pub(crate) fn from_sqlx(binding: &str, operation: &str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted {
                binding: binding.to_string(),
            },
            source => DbError::DataAccess {
                binding: binding.to_string(),
                operation: operation.to_string(),
                source,
            },
        }
    }

    /// Whether this error can only occur while the process is starting.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            DbError::Configuration { .. }
                | DbError::UnresolvedBinding { .. }
                | DbError::Connection { .. }
        )
    }

    /// Whether an external caller may reasonably retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::PoolExhausted { .. })
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
