//! Process wiring: registry, mappers, facade and HTTP state are built here
//! once, in dependency order.

use std::sync::Arc;

use tracing::info;

use crate::api::AppState;
use crate::config::{
    AppConfig, DEFAULT_SERVICE_NAMESPACE, DEFAULT_WEB_NAMESPACE, SERVICE_BINDING, WEB_BINDING,
};
use crate::db::{BindingRegistry, DbResult};
use crate::service::sample::SampleFacadeImpl;
use crate::web::SampleWebMapper;

/// Register the `web` and `service` bindings from configuration.
///
/// No connection is opened here.
pub fn build_registry(config: &AppConfig) -> DbResult<BindingRegistry> {
    let mut registry = BindingRegistry::new();
    let datasources = &config.datasources;

    registry.register_with(
        WEB_BINDING,
        datasources.web.namespace_or(DEFAULT_WEB_NAMESPACE),
        datasources.web.connection.clone(),
        datasources.web.propagation,
    )?;
    registry.register_with(
        SERVICE_BINDING,
        datasources.service.namespace_or(DEFAULT_SERVICE_NAMESPACE),
        datasources.service.connection.clone(),
        datasources.service.propagation,
    )?;
    Ok(registry)
}

/// Bind every mapper and build the HTTP state.
///
/// Fails if any mapper's namespace has no binding.
pub fn assemble(registry: &BindingRegistry) -> DbResult<AppState<SampleFacadeImpl>> {
    let web_mapper = SampleWebMapper::bind(registry)?;
    let facade = SampleFacadeImpl::new(registry)?;
    let web = registry.require(WEB_BINDING)?;
    Ok(AppState::new(facade, web_mapper, web))
}

/// A fully wired application ready to serve.
pub struct Application {
    pub registry: Arc<BindingRegistry>,
    pub state: AppState<SampleFacadeImpl>,
}

impl Application {
    /// Build everything and check that both databases answer.
    pub async fn start(config: &AppConfig) -> DbResult<Self> {
        let registry = build_registry(config)?;
        let state = assemble(&registry)?;
        registry.connect_all().await?;
        info!(bindings = registry.len(), "datasources ready");

        Ok(Self {
            registry: Arc::new(registry),
            state,
        })
    }
}
