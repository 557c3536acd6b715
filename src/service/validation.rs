//! Request-body validation. Every field is checked against its rule and every
//! failure is reported, one entry per field, before the body is deserialized.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Any,
}

impl FieldType {
    fn accepts(self, v: &Value) -> bool {
        match self {
            FieldType::Object => v.is_object(),
            FieldType::Array => v.is_array(),
            FieldType::String => v.is_string(),
            FieldType::Integer => v.is_i64() || v.is_u64(),
            FieldType::Number => v.is_number(),
            FieldType::Boolean => v.is_boolean(),
            FieldType::Any => true,
        }
    }

    fn error_type(self) -> &'static str {
        match self {
            FieldType::Object => "dict_type",
            FieldType::Array => "list_type",
            FieldType::String => "string_type",
            FieldType::Integer => "int_type",
            FieldType::Number => "float_type",
            FieldType::Boolean => "bool_type",
            FieldType::Any => "any_type",
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            FieldType::Object => "Input should be a valid dictionary",
            FieldType::Array => "Input should be a valid list",
            FieldType::String => "Input should be a valid string",
            FieldType::Integer => "Input should be a valid integer",
            FieldType::Number => "Input should be a valid number",
            FieldType::Boolean => "Input should be a valid boolean",
            FieldType::Any => "Input should be a value",
        }
    }
}

/// Rule for one top-level field of a request body.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub nullable: bool,
}

impl FieldRule {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A request body type together with its field rules. Fields not listed are ignored.
pub trait RequestSchema: DeserializeOwned {
    const FIELDS: &'static [FieldRule];
}

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub input: Value,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>, input: Value) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.into(),
            input,
        }
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Checks `body` against `rules`, collecting one error per invalid field.
    pub fn check(body: &Value, rules: &[FieldRule]) -> Vec<FieldError> {
        let map = match body {
            Value::Object(map) => map,
            other => {
                return vec![FieldError::new(
                    &["body"],
                    "Input should be a valid dictionary or object",
                    "model_attributes_type",
                    other.clone(),
                )]
            }
        };
        rules
            .iter()
            .filter_map(|rule| check_field(map, body, rule))
            .collect()
    }

    /// Validates `body` and deserializes it into `T`.
    pub fn parse<T: RequestSchema>(body: Value) -> Result<T, ApiError> {
        let errors = Self::check(&body, T::FIELDS);
        if !errors.is_empty() {
            return Err(validation_error(errors));
        }
        serde_json::from_value(body.clone()).map_err(|e| {
            validation_error(vec![FieldError::new(&["body"], e.to_string(), "value_error", body)])
        })
    }
}

fn check_field(map: &Map<String, Value>, body: &Value, rule: &FieldRule) -> Option<FieldError> {
    let loc = ["body", rule.name];
    match map.get(rule.name) {
        None if rule.required => Some(FieldError::new(&loc, "Field required", "missing", body.clone())),
        None => None,
        Some(Value::Null) if rule.nullable => None,
        Some(Value::Null) if rule.required => Some(FieldError::new(&loc, "Field required", "missing", Value::Null)),
        Some(v) if rule.field_type.accepts(v) => None,
        Some(v) => Some(FieldError::new(
            &loc,
            rule.field_type.expectation(),
            rule.field_type.error_type(),
            v.clone(),
        )),
    }
}

/// `ValidationError` whose `error_data` is the list of field errors.
pub fn validation_error(errors: Vec<FieldError>) -> ApiError {
    let data = serde_json::to_value(&errors).unwrap_or_else(|e| {
        tracing::warn!("failed to encode validation errors: {}", e);
        Value::Array(Vec::new())
    });
    ApiError::validation(data)
}
