//! Sample mapper for the web database.

use crate::db::{BindingRegistry, BoundUnit, DataAccessUnit, DbResult, TransactionScope};

/// Connectivity check against the web database.
pub const TEST_CONNECTION: DataAccessUnit =
    DataAccessUnit::new(module_path!(), "test_connection", "SELECT 1");

#[derive(Debug, Clone)]
pub struct SampleWebMapper {
    test_connection: BoundUnit,
}

impl SampleWebMapper {
    /// Bind this mapper's units. Fails at startup if no binding covers
    /// this module.
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
