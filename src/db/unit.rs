//! Data access units and their execution.
//!
//! A [`DataAccessUnit`] is one named SQL operation owned by a module
//! namespace. The registry turns it into a [`BoundUnit`] at startup, after
//! which it can only ever run against its own binding's pool.

use std::borrow::Cow;
use std::sync::Arc;

use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Decode, FromRow, Row, Type};
use tracing::{debug, warn};

use super::binding::DatabaseBinding;
use super::transaction::TransactionScope;
use crate::db::{DbError, DbResult};

/// A named SQL operation owned by a namespace.
///
/// The SQL text is passed to the bound database unchanged, so placeholders
/// must use that engine's syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAccessUnit {
    namespace: Cow<'static, str>,
    name: Cow<'static, str>,
    sql: Cow<'static, str>,
}

impl DataAccessUnit {
    /// Declare a unit in a `const`, usually with `module_path!()` as the
    /// namespace.
    pub const fn new(namespace: &'static str, name: &'static str, sql: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            name: Cow::Borrowed(name),
            sql: Cow::Borrowed(sql),
        }
    }

    pub fn owned(
        namespace: impl Into<String>,
        name: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Cow::Owned(namespace.into()),
            name: Cow::Owned(name.into()),
            sql: Cow::Owned(sql.into()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(i64::from(v))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map_or(Param::Null, Into::into)
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Param],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Param::Null => query.bind(Option::<i64>::None),
            Param::Bool(v) => query.bind(*v),
            Param::Int(v) => query.bind(*v),
            Param::Float(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

/// A unit resolved to its binding.
#[derive(Debug, Clone)]
pub struct BoundUnit {
    unit: Arc<DataAccessUnit>,
    binding: Arc<DatabaseBinding>,
}

impl BoundUnit {
    pub(crate) fn new(unit: DataAccessUnit, binding: Arc<DatabaseBinding>) -> Self {
        Self {
            unit: Arc::new(unit),
            binding,
        }
    }

    pub fn unit(&self) -> &DataAccessUnit {
        &self.unit
    }

    pub fn binding(&self) -> &Arc<DatabaseBinding> {
        &self.binding
    }

    /// Run a statement and return the number of affected rows.
    ///
    /// With `Some(scope)` on this unit's binding the statement joins that
    /// transaction. A scope on any other binding is ignored and the
    /// statement runs on this unit's pool.
    pub async fn execute(
        &self,
        scope: Option<&mut TransactionScope>,
        params: &[Param],
    ) -> DbResult<u64> {
        let query = bind_all(sqlx::query(self.unit.sql()), params);
        let result = match self.scope_connection(scope)? {
            Some(conn) => query.execute(conn).await,
            None => query.execute(&self.binding.pool().await?).await,
        };
        result
            .map(|done| done.rows_affected())
            .map_err(|e| self.error(e))
    }

    /// Run a query and return all rows.
    pub async fn fetch_all(
        &self,
        scope: Option<&mut TransactionScope>,
        params: &[Param],
    ) -> DbResult<Vec<AnyRow>> {
        let query = bind_all(sqlx::query(self.unit.sql()), params);
        let result = match self.scope_connection(scope)? {
            Some(conn) => query.fetch_all(conn).await,
            None => query.fetch_all(&self.binding.pool().await?).await,
        };
        let rows = result.map_err(|e| self.error(e))?;
        debug!(
            binding = %self.binding.name(),
            unit = %self.unit.name(),
            rows = rows.len(),
            "unit executed"
        );
        Ok(rows)
    }

    /// Run a query and decode the first column of the first row.
    pub async fn fetch_scalar<T>(
        &self,
        scope: Option<&mut TransactionScope>,
        params: &[Param],
    ) -> DbResult<T>
    where
        T: for<'r> Decode<'r, Any> + Type<Any>,
    {
        let rows = self.fetch_all(scope, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| self.error(sqlx::Error::RowNotFound))?;
        row.try_get::<T, _>(0).map_err(|e| self.error(e))
    }

    /// Run a query and map every row to `T`.
    pub async fn fetch_as<T>(
        &self,
        scope: Option<&mut TransactionScope>,
        params: &[Param],
    ) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, AnyRow>,
    {
        self.fetch_all(scope, params)
            .await?
            .iter()
            .map(|row| T::from_row(row).map_err(|e| self.error(e)))
            .collect()
    }

    fn scope_connection<'s>(
        &self,
        scope: Option<&'s mut TransactionScope>,
    ) -> DbResult<Option<&'s mut AnyConnection>> {
        match scope {
            Some(scope) if scope.is_on(self.binding.lazy_pool()) => scope.connection().map(Some),
            Some(scope) => {
                warn!(
                    unit = %self.unit.name(),
                    unit_binding = %self.binding.name(),
                    scope_binding = %scope.binding(),
                    "scope belongs to another binding, running on the unit's own pool"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn error(&self, source: sqlx::Error) -> DbError {
        DbError::from_sqlx(self.binding.name(), self.unit.name(), source)
    }
}
