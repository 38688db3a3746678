//! Application state for the API server.

use std::sync::Arc;

use crate::db::DatabaseBinding;
use crate::service::sample::SampleFacade;
use crate::web::SampleWebMapper;

/// Shared application state.
///
/// Generic over `F: SampleFacade` so handlers can be exercised against a
/// stub facade. Everything is built up front by `app::assemble` and only
/// read afterwards.
pub struct AppState<F: SampleFacade> {
    facade: Arc<F>,
    web_mapper: SampleWebMapper,
    web: Arc<DatabaseBinding>,
}

// Manual Clone impl - only the Arc needs to be cloneable, not F
impl<F: SampleFacade> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            facade: Arc::clone(&self.facade),
            web_mapper: self.web_mapper.clone(),
            web: Arc::clone(&self.web),
        }
    }
}

impl<F: SampleFacade> AppState<F> {
    /// `web` is the binding whose transaction scope the web layer's own
    /// checks run in.
    pub fn new(facade: F, web_mapper: SampleWebMapper, web: Arc<DatabaseBinding>) -> Self {
        Self {
            facade: Arc::new(facade),
            web_mapper,
            web,
        }
    }

    pub fn facade(&self) -> &F {
        &self.facade
    }

    pub fn web_mapper(&self) -> &SampleWebMapper {
        &self.web_mapper
    }

    pub fn web(&self) -> &DatabaseBinding {
        &self.web
    }
}
