//! Shared request validation helpers for inbound HTTP adapters.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::domain::{DateRangeError, Error};

/// Validation error codes for request failures detected at the HTTP edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidDate,
    InvalidRange,
    RangeTooLong,
    NotAnObject,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::InvalidRange => "invalid_range",
            ErrorCode::RangeTooLong => "range_too_long",
            ErrorCode::NotAnObject => "not_an_object",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }

    fn with_index(self, code: ErrorCode, index: usize) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "index": index,
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn invalid_date_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a date in YYYY-MM-DD format"))
        .with_value(ErrorCode::InvalidDate, value)
}

pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid_date_error(field, value))
}

pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<NaiveDate>, Error> {
    value.map(|raw| parse_date(raw, field)).transpose()
}

pub(crate) fn date_range_error(err: &DateRangeError) -> Error {
    let code = match err {
        DateRangeError::Inverted { .. } => ErrorCode::InvalidRange,
        DateRangeError::TooLong { .. } => ErrorCode::RangeTooLong,
    };
    ValidationError::new("start_date", err.to_string()).with_code(code)
}

/// Split a comma-separated model filter, ignoring blank entries.
///
/// An absent or entirely blank filter means "all models".
pub(crate) fn parse_model_filter(value: Option<&str>) -> Option<BTreeSet<String>> {
    let models: BTreeSet<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_owned)
        .collect();
    (!models.is_empty()).then_some(models)
}

/// Require `metadata` to be a JSON object; absent or `null` means empty.
pub(crate) fn parse_metadata(
    value: Option<Value>,
    index: Option<usize>,
) -> Result<Map<String, Value>, Error> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => {
            let error = ValidationError::new("metadata", "metadata must be a JSON object");
            Err(match index {
                Some(index) => error.with_index(ErrorCode::NotAnObject, index),
                None => error.with_code(ErrorCode::NotAnObject),
            })
        }
    }
}
