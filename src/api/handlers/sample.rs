//! Sample handlers demonstrating the two datasources.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::db::{CallScopes, DbError};
use crate::dto::SampleRecord;
use crate::service::sample::SampleFacade;

// =============================================================================
// DTOs
// =============================================================================

/// Result of a connectivity check
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionCheckResponse {
    /// Which database answered
    #[schema(example = "WebDB (MySQL)")]
    pub database: String,
    /// Value returned by the test query
    #[schema(example = 1)]
    pub connection: i64,
    #[schema(example = "OK")]
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "UP")]
    pub status: String,
    #[schema(example = "Dual datasource application is running")]
    pub message: String,
}

/// Error response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Database operation failed")]
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Map a database error to a status and a fixed message. Driver text only
/// goes to the log.
pub(crate) fn error_response(e: DbError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match e {
        DbError::PoolExhausted { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "No database connection available, try again later",
        ),
        DbError::Connection { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database is unreachable",
        ),
        DbError::TransactionState { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Transaction could not be completed",
        ),
        DbError::DataAccess { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database operation failed",
        ),
        DbError::Configuration { .. } | DbError::UnresolvedBinding { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        ),
    };
    warn!(error = %e, status = status.as_u16(), "request failed");
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Get sample data
///
/// Returns static data from the service layer without touching a database
#[utoipa::path(
    get,
    path = "/api/sample/data",
    tag = "sample",
    responses(
        (status = 200, description = "Sample record", body = SampleRecord)
    )
)]
#[instrument(skip(state))]
pub async fn get_sample_data<F: SampleFacade>(
    State(state): State<AppState<F>>,
) -> Json<SampleRecord> {
    Json(state.facade().get_sample_data())
}

/// Test the web database
///
/// Runs the web mapper's test query inside a web transaction
#[utoipa::path(
    get,
    path = "/api/sample/test-web-db",
    tag = "sample",
    responses(
        (status = 200, description = "Web database answered", body = ConnectionCheckResponse),
        (status = 500, description = "Database error", body = ErrorResponse),
        (status = 503, description = "No connection available", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn test_web_db<F: SampleFacade>(
    State(state): State<AppState<F>>,
) -> ApiResult<ConnectionCheckResponse> {
    let calls = CallScopes::new();
    let mapper = state.web_mapper().clone();

    let connection = state
        .web()
        .transactions()
        .transactional(&calls, move |scope| {
            Box::pin(async move { mapper.test_connection(Some(scope)).await })
        })
        .await
        .map_err(error_response)?;

    Ok(Json(ConnectionCheckResponse {
        database: "WebDB (MySQL)".to_string(),
        connection,
        status: "OK".to_string(),
    }))
}

/// Test the service database
///
/// Delegates to the sample facade, which opens its own service transaction
#[utoipa::path(
    get,
    path = "/api/sample/test-service-db",
    tag = "sample",
    responses(
        (status = 200, description = "Service database answered", body = ConnectionCheckResponse),
        (status = 500, description = "Database error", body = ErrorResponse),
        (status = 503, description = "No connection available", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn test_service_db<F: SampleFacade>(
    State(state): State<AppState<F>>,
) -> ApiResult<ConnectionCheckResponse> {
    let calls = CallScopes::new();
    let connection = state
        .facade()
        .test_service_db(&calls)
        .await
        .map_err(error_response)?;

    Ok(Json(ConnectionCheckResponse {
        database: "ServiceDB (PostgreSQL)".to_string(),
        connection,
        status: "OK".to_string(),
    }))
}

/// Health check endpoint
///
/// Reports liveness only; no database is contacted
#[utoipa::path(
    get,
    path = "/api/sample/health",
    tag = "sample",
    responses(
        (status = 200, description = "Application is running", body = HealthResponse)
    )
)]
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        message: "Dual datasource application is running".to_string(),
    })
}
