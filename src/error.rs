//! Error taxonomy and the single place where errors become HTTP responses.

use crate::db::SessionError;
use crate::response::ErrorBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Kind of a client-visible error. Each kind carries a default status, numeric
/// code and message; [`ErrorKind::Transport`] covers framework-level failures
/// (unmatched route, unsupported method, oversized body) by status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
    Transport(StatusCode),
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest | ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Transport(status) => status,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ErrorKind::BadRequest => 400_000,
            ErrorKind::ValidationError => 400_001,
            ErrorKind::Unauthorized => 401_000,
            ErrorKind::Forbidden => 403_000,
            ErrorKind::NotFound => 404_000,
            ErrorKind::MethodNotAllowed => 405_000,
            ErrorKind::InternalServerError => 500_000,
            ErrorKind::Transport(status) => i64::from(status.as_u16()) * 1000,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad request.",
            ErrorKind::ValidationError => "Validation error.",
            ErrorKind::Unauthorized => "Unauthorized.",
            ErrorKind::Forbidden => "Forbidden.",
            ErrorKind::NotFound => "Not found.",
            ErrorKind::MethodNotAllowed => "Method not allowed.",
            ErrorKind::InternalServerError => "Internal server error.",
            ErrorKind::Transport(status) => status.canonical_reason().unwrap_or("Unknown error"),
        }
    }
}

/// A client-visible error: kind defaults plus optional overrides set at raise time.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    kind: ErrorKind,
    message: Option<String>,
    data: Option<Value>,
    code: Option<i64>,
    status: Option<StatusCode>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            data: None,
            code: None,
            status: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    /// Validation failure carrying one entry per invalid field.
    pub fn validation(errors: Value) -> Self {
        Self::new(ErrorKind::ValidationError).with_data(errors)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalServerError)
    }

    pub fn transport(status: StatusCode) -> Self {
        Self::new(ErrorKind::Transport(status))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.kind.status())
    }

    pub fn code(&self) -> i64 {
        self.code.unwrap_or_else(|| self.kind.code())
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_else(|| self.kind.message())
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl StdError for ApiError {}

/// Everything a handler can fail with.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session: {0}")]
    Session(#[from] SessionError),
    #[error("database: {0}")]
    Db(sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::Api(ApiError::not_found()),
            e => AppError::Db(e),
        }
    }
}

/// Maps an error to its status and envelope, logging it once.
///
/// Client-visible errors keep their own status, code and message. Everything
/// else is logged with its full source chain and answered with the generic
/// internal-server-error body.
pub fn convert(error: &AppError) -> (StatusCode, ErrorBody) {
    match error {
        AppError::Api(api) => {
            log_api_error(api);
            (api.status(), ErrorBody::from(api))
        }
        AppError::Session(_) | AppError::Db(_) | AppError::Unexpected(_) => {
            tracing::error!(error = %report(error), "unhandled error");
            let api = ApiError::internal();
            (api.status(), ErrorBody::from(&api))
        }
    }
}

fn log_api_error(api: &ApiError) {
    let status = api.status();
    if let ErrorKind::Transport(_) = api.kind() {
        tracing::debug!(status = status.as_u16(), error_code = api.code(), "{}", api.message());
    } else if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error_code = api.code(), error_data = ?api.data(), "{}", api.message());
    } else {
        tracing::warn!(error_code = api.code(), error_data = ?api.data(), "{}", api.message());
    }
}

/// Full description of an unhandled error: the message, every source, and the
/// backtrace when one was captured.
fn report(error: &AppError) -> String {
    if let AppError::Unexpected(e) = error {
        return format!("{:?}", e);
    }
    let mut out = error.to_string();
    let mut source = StdError::source(error);
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = StdError::source(cause);
    }
    out
}

fn render(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = convert(&self);
        render(status, body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        AppError::Api(self).into_response()
    }
}

/// Response for a handler that panicked. Installed through
/// `tower_http::catch_panic`; the panic payload is logged, never returned.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = detail, "handler panicked");
    let api = ApiError::internal();
    render(api.status(), ErrorBody::from(&api))
}

/// Fallback for paths no route matches.
pub async fn route_not_found() -> ApiError {
    ApiError::transport(StatusCode::NOT_FOUND)
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::transport(StatusCode::METHOD_NOT_ALLOWED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_defaults_follow_the_table() {
        let table = [
            (ErrorKind::BadRequest, 400, 400_000, "Bad request."),
            (ErrorKind::ValidationError, 400, 400_001, "Validation error."),
            (ErrorKind::Unauthorized, 401, 401_000, "Unauthorized."),
            (ErrorKind::Forbidden, 403, 403_000, "Forbidden."),
            (ErrorKind::NotFound, 404, 404_000, "Not found."),
            (ErrorKind::MethodNotAllowed, 405, 405_000, "Method not allowed."),
            (ErrorKind::InternalServerError, 500, 500_000, "Internal server error."),
        ];
        for (kind, status, code, message) in table {
            assert_eq!(kind.status().as_u16(), status, "{:?}", kind);
            assert_eq!(kind.code(), code, "{:?}", kind);
            assert_eq!(kind.message(), message, "{:?}", kind);
        }
    }

    #[test]
    fn transport_code_is_status_times_thousand() {
        let err = ApiError::transport(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.code(), 405_000);
        assert_eq!(err.message(), "Method Not Allowed");

        let err = ApiError::transport(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), 413_000);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let err = ApiError::not_found()
            .with_message("Item 7 does not exist.")
            .with_code(404_007)
            .with_status(StatusCode::GONE);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), StatusCode::GONE);
        assert_eq!(err.code(), 404_007);
        assert_eq!(err.message(), "Item 7 does not exist.");
        assert_eq!(err.to_string(), "Item 7 does not exist.");
    }

    #[test]
    fn client_errors_keep_data_server_errors_drop_it() {
        let (status, body) = convert(&AppError::from(
            ApiError::bad_request().with_data(json!({"field": "name"})),
        ));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_data, Some(json!({"field": "name"})));

        let (status, body) = convert(&AppError::from(
            ApiError::internal().with_data(json!({"secret": "stack"})),
        ));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_data, None);
    }

    #[test]
    fn unhandled_errors_become_generic_500() {
        let err = AppError::from(anyhow::anyhow!("connection reset by peer"));
        let (status, body) = convert(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            ErrorBody {
                error_message: Some("Internal server error.".into()),
                error_data: None,
                error_code: Some(500_000),
            }
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        let (status, body) = convert(&err);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error_code, Some(404_000));
    }

    #[test]
    fn session_errors_are_internal() {
        let (status, body) = convert(&AppError::from(SessionError::NoActiveScope));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_message.as_deref(), Some("Internal server error."));
    }
}
