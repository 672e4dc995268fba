use axum::routing::{get, post};
use axum::{middleware, Router};

use backend_application::AppState;

use crate::handlers::{admin_handlers, ops_handlers, page_handlers, scanner_handlers};
use crate::middleware::track_activity;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/scanner/connect", post(scanner_handlers::connect_scanner))
        .route("/api/scan/verify", post(scanner_handlers::verify_ticket))
        .route("/api/admin/stats", get(admin_handlers::admin_stats))
        .route("/api/admin/feed", get(admin_handlers::admin_feed))
        .route("/api/admin/metrics", get(ops_handlers::metrics_prometheus))
        .route("/api/health", get(ops_handlers::health))
        .route("/scanner", get(page_handlers::scanner_page))
        .route("/admin", get(page_handlers::admin_page))
        .route("/", get(page_handlers::index))
        .fallback(ops_handlers::route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_activity))
        .with_state(state)
}
