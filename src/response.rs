//! Response bodies shared by all routes.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error_message: Option<String>,
    pub error_data: Option<Value>,
    pub error_code: Option<i64>,
}

impl From<&ApiError> for ErrorBody {
    fn from(error: &ApiError) -> Self {
        // Server errors never carry structured detail.
        let error_data = if error.status().is_server_error() {
            None
        } else {
            error.data().cloned()
        };
        Self {
            error_message: Some(error.message().to_string()),
            error_data,
            error_code: Some(error.code()),
        }
    }
}

/// `{}`
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct Empty {}
