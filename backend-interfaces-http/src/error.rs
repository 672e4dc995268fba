use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use backend_application::AppError;
use backend_domain::ErrorBody;

#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    UnknownScanner(String),
    NotFound(String),
    Conflict(String),
    Store(String),
    BadGateway(String),
    Unavailable(String),
    Internal(String),
}

impl HttpError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            HttpError::UnknownScanner(msg) => (StatusCode::BAD_REQUEST, "unknown_scanner", msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            HttpError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            HttpError::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
            HttpError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "network_error", msg),
            HttpError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        }
    }
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::Validation(msg) => HttpError::BadRequest(msg),
            AppError::UnknownScanner(id) => HttpError::UnknownScanner(format!(
                "scanner {} is not connected; reconnect and retry",
                id
            )),
            AppError::NotFound(msg) => HttpError::NotFound(format!("{} not found", msg)),
            AppError::Conflict(msg) => HttpError::Conflict(msg),
            AppError::Store(err) => HttpError::Store(err.to_string()),
            AppError::Network(err) => HttpError::BadGateway(err.to_string()),
            AppError::Internal(err) => HttpError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(value: JsonRejection) -> Self {
        HttpError::BadRequest(format!("invalid request body: {}", value.body_text()))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!("request failed with {}: {}", status, message);
        }
        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::{BackendError, StoreError};

    #[test]
    fn app_errors_map_to_status_and_code() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST, "validation"),
            (AppError::UnknownScanner("s".into()), StatusCode::BAD_REQUEST, "unknown_scanner"),
            (AppError::NotFound("event E1".into()), StatusCode::NOT_FOUND, "not_found"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "conflict"),
            (
                AppError::Store(StoreError::Unavailable("locked".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
            ),
            (
                AppError::Network(BackendError::Unreachable("down".into())),
                StatusCode::BAD_GATEWAY,
                "network_error",
            ),
        ];
        for (err, status, code) in cases {
            let http = HttpError::from(err);
            let (got_status, got_code, _) = http.parts();
            assert_eq!(got_status, status);
            assert_eq!(got_code, code);
        }
    }
}
