//! API route configuration.

use axum::Router;
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::handlers::{self, ConnectionCheckResponse, ErrorResponse, HealthResponse};
use super::state::AppState;
use crate::dto::SampleRecord;
use crate::service::sample::SampleFacade;

/// Build routes with a generic facade type.
///
/// Applies the turbofish to each handler so the route table stays readable.
macro_rules! routes {
    ($F:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$F>));
        )*
        router
    }};
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PUML Web API",
        version = "0.1.0",
        description = "Sample endpoints backed by separate web and service databases",
        license(name = "GPL-2.0")
    ),
    paths(
        handlers::get_sample_data,
        handlers::test_web_db,
        handlers::test_service_db,
        handlers::health,
    ),
    components(schemas(SampleRecord, ConnectionCheckResponse, HealthResponse, ErrorResponse)),
    tags(
        (name = "sample", description = "Dual datasource sample endpoints")
    )
)]
pub struct ApiDoc;

/// Create the API router with OpenAPI documentation at `/docs`
pub fn create_router<F: SampleFacade>(state: AppState<F>) -> Router {
    let api = ApiDoc::openapi();

    // Liveness never needs state
    let system_routes = Router::new().route("/api/sample/health", get(handlers::health));

    let sample_routes = routes!(F => {
        get "/api/sample/data" => handlers::get_sample_data,
        get "/api/sample/test-web-db" => handlers::test_web_db,
        get "/api/sample/test-service-db" => handlers::test_service_db,
    });

    system_routes
        .merge(sample_routes)
        .merge(Scalar::with_url("/docs", api))
        .with_state(state)
}
