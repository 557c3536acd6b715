//! Request middleware: session scope and access-log span.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Span;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Runs the rest of the request inside a database scope. The scope's session is
/// released when the handler returns, fails, panics or is cancelled.
pub async fn session_scope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.db.scope(next.run(req)).await {
        Ok(response) => response,
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Span for the access log: one per request, carrying method, path, request id
/// and the client-supplied user agent and forwarding chain.
pub fn access_span(req: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %header_value(req, &REQUEST_ID_HEADER),
        user_agent = %header_value(req, &header::USER_AGENT),
        x_forwarded_for = %header_value(req, &X_FORWARDED_FOR),
        content_length = %header_value(req, &header::CONTENT_LENGTH),
    )
}

fn header_value<'a>(req: &'a Request, name: &HeaderName) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}
