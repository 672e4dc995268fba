use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use backend_application::blocking::run_blocking;
use backend_application::queries::admin_queries;
use backend_application::AppState;
use backend_domain::HealthStatus;

use crate::error::HttpError;

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, HttpError> {
    let store = state.store.clone();
    run_blocking(move || store.ping()).await.map_err(|err| {
        error!("health check failed: {}", err);
        HttpError::Unavailable(err.to_string())
    })?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}

pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    (StatusCode::OK, headers, admin_queries::metrics_text(&state))
}

pub async fn route_not_found() -> HttpError {
    HttpError::NotFound("route not found".to_string())
}
