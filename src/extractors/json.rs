//! JSON body extractor that reports every invalid field at once.

use crate::error::ApiError;
use crate::service::validation::{validation_error, FieldError, RequestSchema, RequestValidator};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::{Map, Value};

/// Longest prefix of a malformed body echoed back in `input`, in characters.
const ECHOED_INPUT_CHARS: usize = 256;

/// Extracts and validates a `T` from the request body.
///
/// An empty body is treated as `{}` so endpoints whose fields are all optional
/// can be called without one. Malformed JSON and rule violations are rejected
/// with a `ValidationError`; a body over the size limit with a 413 transport error.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: RequestSchema,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::transport(rejection.status()))?;
        let body = parse_body(&bytes)?;
        RequestValidator::parse(body).map(ValidatedJson)
    }
}

fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        let (line, column) = (e.line().to_string(), e.column().to_string());
        validation_error(vec![FieldError::new(
            &["body", line.as_str(), column.as_str()],
            format!("JSON decode error: {}", e),
            "json_invalid",
            Value::String(echoed_input(bytes)),
        )])
    })
}

fn echoed_input(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(ECHOED_INPUT_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_body_is_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_body(b"{\"data\": ").unwrap_err();
        assert_eq!(err.code(), 400_001);
        let data = err.data().unwrap().as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["type"], "json_invalid");
        assert_eq!(data[0]["input"], "{\"data\": ");
    }

    #[test]
    fn long_malformed_body_is_truncated_in_input() {
        let body = format!("{{\"data\": \"{}", "é".repeat(10_000));
        let err = parse_body(body.as_bytes()).unwrap_err();
        let input = err.data().unwrap()[0]["input"].as_str().unwrap().to_string();
        assert!(input.ends_with("..."));
        assert_eq!(input.chars().count(), ECHOED_INPUT_CHARS + 3);
        assert!(body.starts_with(input.trim_end_matches("...")));
    }
}
