use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use backend_application::commands::{scanner_commands, verify_commands};
use backend_application::AppState;
use backend_domain::{ConnectRequest, ConnectResponse, VerifyRequest, VerifyResponse};

use crate::error::HttpError;

pub async fn connect_scanner(
    State(state): State<AppState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>, HttpError> {
    let Json(request) = payload?;
    let response = scanner_commands::connect_scanner(&state, request).await?;
    Ok(Json(response))
}

/// All three scan outcomes are 200; only malformed input and store failures are errors.
pub async fn verify_ticket(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, HttpError> {
    let received_at = Instant::now();
    let Json(request) = payload?;
    let response = verify_commands::verify_ticket(&state, request, received_at).await?;
    Ok(Json(response))
}
