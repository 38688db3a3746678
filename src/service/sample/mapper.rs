//! Sample mapper for the service database.

use crate::db::{BindingRegistry, BoundUnit, DataAccessUnit, DbResult, TransactionScope};

/// Connectivity check against the service database.
pub const TEST_CONNECTION: DataAccessUnit =
    DataAccessUnit::new(module_path!(), "test_connection", "SELECT 1");

#[derive(Debug, Clone)]
pub struct SampleServiceMapper {
    test_connection: BoundUnit,
}

impl SampleServiceMapper {
    pub fn bind(registry: &BindingRegistry) -> DbResult<Self> {
        Ok(Self {
            test_connection: registry.bind(TEST_CONNECTION)?,
        })
    }

    /// Returns 1 when the database answers.
    pub async fn test_connection(&self, scope: Option<&mut TransactionScope>) -> DbResult<i64> {
        self.test_connection.fetch_scalar(scope, &[]).await
    }

    pub fn binding_name(&self) -> &str {
        self.test_connection.binding().name()
    }
}
