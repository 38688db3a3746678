//! Per-namespace database routing.
//!
//! Every data access unit belongs to a module namespace. The registry maps
//! namespace patterns to bindings, and each binding owns one connection pool
//! and one transaction manager. Scopes opened on one binding never touch
//! another.
//!
//! # Architecture
//!
//! - `error`: Error taxonomy for routing and execution
//! - `namespace`: Namespace patterns and most-specific matching
//! - `binding`: Connection configuration and `DatabaseBinding`
//! - `pool`: Lazily created, once-only pool per binding
//! - `registry`: `BindingRegistry`, register/resolve/bind
//! - `transaction`: `TransactionManager`, `TransactionScope`, `CallScopes`
//! - `unit`: `DataAccessUnit`, `BoundUnit` and parameter binding

mod binding;
mod error;
mod namespace;
mod pool;
mod registry;
mod transaction;
mod unit;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
mod unit_test;

pub use binding::{ConnectionConfig, DatabaseBinding, DatabaseKind};
pub use error::{DbError, DbResult};
pub use namespace::NamespacePattern;
pub use registry::BindingRegistry;
pub use transaction::{
    CallScopes, Propagation, ScopeState, TransactionManager, TransactionScope, TransactionStats,
};
pub use unit::{BoundUnit, DataAccessUnit, Param};
