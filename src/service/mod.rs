//! Queries and request validation used by the handlers.

pub mod items;
pub mod validation;

pub use validation::{FieldRule, FieldType, RequestSchema, RequestValidator};
