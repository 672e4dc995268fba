use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use backend_application::AppState;

/// Re-arms the idle timer after every successful `/api` request.
pub async fn track_activity(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let counts = request.uri().path().starts_with("/api/");
    let response = next.run(request).await;
    if counts && response.status().is_success() {
        state.idle_timer.touch();
    }
    response
}
