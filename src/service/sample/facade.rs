//! Sample facade used by the web layer.

use std::future::Future;
use std::sync::Arc;

use tracing::instrument;

use super::mapper::SampleServiceMapper;
use crate::config::SERVICE_BINDING;
use crate::db::{BindingRegistry, CallScopes, DatabaseBinding, DbError, DbResult};
use crate::dto::SampleRecord;

/// Business operations exposed to the web layer.
pub trait SampleFacade: Send + Sync + 'static {
    /// Static sample data; touches no database.
    fn get_sample_data(&self) -> SampleRecord;

    /// Run the service connectivity check inside a service transaction.
    fn test_service_db(&self, calls: &CallScopes) -> impl Future<Output = DbResult<i64>> + Send;
}

pub struct SampleFacadeImpl {
    mapper: SampleServiceMapper,
    scope: Arc<DatabaseBinding>,
}

impl SampleFacadeImpl {
    /// Binding whose transaction scope `test_service_db` runs in.
    pub const TEST_SERVICE_DB_SCOPE: &'static str = SERVICE_BINDING;

    pub fn new(registry: &BindingRegistry) -> DbResult<Self> {
        let scope = registry.require(Self::TEST_SERVICE_DB_SCOPE)?;
        let mapper = SampleServiceMapper::bind(registry)?;
        if mapper.binding_name() != scope.name() {
            return Err(DbError::Configuration {
                message: format!(
                    "service mapper resolves to binding '{}' but test_service_db runs in '{}'",
                    mapper.binding_name(),
                    scope.name()
                ),
            });
        }
        Ok(Self { mapper, scope })
    }
}

impl SampleFacade for SampleFacadeImpl {
    fn get_sample_data(&self) -> SampleRecord {
        SampleRecord {
            id: 1,
            name: "Sample".to_string(),
            description: "Sample data from service layer".to_string(),
        }
    }

    #[instrument(skip_all)]
    async fn test_service_db(&self, calls: &CallScopes) -> DbResult<i64> {
        let mapper = self.mapper.clone();
        self.scope
            .transactions()
            .transactional(calls, move |scope| {
                Box::pin(async move { mapper.test_connection(Some(scope)).await })
            })
            .await
    }
}
