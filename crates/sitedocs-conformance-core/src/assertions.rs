// crates/sitedocs-conformance-core/src/assertions.rs
// ============================================================================
// Module: Response Assertions
// Description: Status, shape, and containment checks over API responses.
// Purpose: Turn each expectation into a typed error naming the mismatch.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Assertions return `Result<(), AssertionError>` so cases compose them with
//! `?`. Structural failures name the JSON pointer of the first mismatch, which
//! keeps report output short even for large fixture documents.
//!
//! Containment is the default comparison for records: the response may carry
//! fields the fixture does not mention, but every fixture field must match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::client::ApiResponse;
use crate::client::ResponseBody;

// ============================================================================
// SECTION: Field Lists
// ============================================================================

/// Fields every form record exposes.
pub const FORM_FIELDS: &[&str] = &[
    "Id",
    "Label",
    "CreatedOn",
    "CreatedBy",
    "IsDeleted",
    "DocumentId",
    "DocumentTemplateVersionId",
    "DocumentTemplateId",
    "HasGoodData",
    "PrecedingVersionId",
    "Due",
    "IsPrivate",
    "CreatingCompanyId",
    "LocationId",
    "DocumentTemplateName",
    "Type",
    "FormScheduleGroupId",
    "ProcessRunId",
    "ProcessDefinitionId",
];

/// Fields every location record exposes.
pub const LOCATION_FIELDS: &[&str] = &[
    "Id",
    "Name",
    "Description",
    "Address",
    "StartDate",
    "EndDate",
    "CreatingCompanyId",
    "IsArchived",
    "CreatedOn",
];

/// Maximum body excerpt carried by status errors.
const BODY_EXCERPT_CHARS: usize = 240;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A failed expectation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    /// Status code differs from the expected one.
    #[error("expected status {expected}, got {actual}: {body}")]
    Status {
        /// Expected status code.
        expected: u16,
        /// Actual status code.
        actual: u16,
        /// Excerpt of the response body.
        body: String,
    },
    /// Status code is not in the 4xx range.
    #[error("expected a client error status, got {actual}")]
    NotClientError {
        /// Actual status code.
        actual: u16,
    },
    /// Body was not JSON.
    #[error("expected a JSON body, got {kind}")]
    NotJson {
        /// Kind of body received.
        kind: &'static str,
    },
    /// A value differs.
    #[error("mismatch at {pointer}: expected {expected}, got {actual}")]
    Mismatch {
        /// JSON pointer of the mismatch.
        pointer: String,
        /// Expected value rendered as JSON.
        expected: String,
        /// Actual value rendered as JSON.
        actual: String,
    },
    /// An expected key is absent.
    #[error("missing key at {pointer}")]
    MissingKey {
        /// JSON pointer of the missing key.
        pointer: String,
    },
    /// An actual object carries a key the expected value does not.
    #[error("unexpected key at {pointer}")]
    UnexpectedKey {
        /// JSON pointer of the extra key.
        pointer: String,
    },
    /// Arrays differ in length.
    #[error("length mismatch at {pointer}: expected {expected}, got {actual}")]
    Length {
        /// JSON pointer of the array.
        pointer: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Enumerated fields are absent.
    #[error("missing fields: {}", .fields.join(", "))]
    MissingFields {
        /// Every missing field name.
        fields: Vec<String>,
    },
    /// A value is not of the expected JSON type.
    #[error("expected {expected} at {pointer}, got {actual}")]
    Type {
        /// JSON pointer of the value.
        pointer: String,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type.
        actual: &'static str,
    },
    /// Vendor error message differs.
    #[error("expected message '{expected}', got '{}'", .actual.as_deref().unwrap_or("<none>"))]
    Message {
        /// Expected message text.
        expected: String,
        /// Actual message, when present.
        actual: Option<String>,
    },
    /// Content type differs.
    #[error("expected content type {expected}, got {}", .actual.as_deref().unwrap_or("<none>"))]
    ContentType {
        /// Expected media type.
        expected: String,
        /// Actual media type, when present.
        actual: Option<String>,
    },
    /// Body was empty.
    #[error("expected a non-empty body")]
    EmptyBody,
}

// ============================================================================
// SECTION: Response Assertions
// ============================================================================

/// Asserts an exact status code.
///
/// # Errors
///
/// Returns [`AssertionError::Status`] with a body excerpt on mismatch.
pub fn expect_status(response: &ApiResponse, expected: StatusCode) -> Result<(), AssertionError> {
    if response.status == expected {
        return Ok(());
    }
    Err(AssertionError::Status {
        expected: expected.as_u16(),
        actual: response.status.as_u16(),
        body: body_excerpt(&response.body),
    })
}

/// Asserts a 4xx status.
///
/// # Errors
///
/// Returns [`AssertionError::NotClientError`] otherwise.
pub fn expect_client_error(response: &ApiResponse) -> Result<(), AssertionError> {
    if response.status.is_client_error() {
        return Ok(());
    }
    Err(AssertionError::NotClientError {
        actual: response.status.as_u16(),
    })
}

/// Returns the JSON body or fails.
///
/// # Errors
///
/// Returns [`AssertionError::NotJson`] for empty, text, or binary bodies.
pub fn response_json(response: &ApiResponse) -> Result<&Value, AssertionError> {
    match &response.body {
        ResponseBody::Json(value) => Ok(value),
        ResponseBody::Empty => Err(AssertionError::NotJson {
            kind: "an empty body",
        }),
        ResponseBody::Text(_) => Err(AssertionError::NotJson {
            kind: "text",
        }),
        ResponseBody::Binary(_) => Err(AssertionError::NotJson {
            kind: "binary data",
        }),
    }
}

/// Asserts the media type, ignoring parameters and case.
///
/// # Errors
///
/// Returns [`AssertionError::ContentType`] on mismatch.
pub fn expect_content_type(response: &ApiResponse, expected: &str) -> Result<(), AssertionError> {
    let actual = response.content_type();
    if actual.is_some_and(|mt| mt.eq_ignore_ascii_case(expected)) {
        return Ok(());
    }
    Err(AssertionError::ContentType {
        expected: expected.to_string(),
        actual: actual.map(str::to_string),
    })
}

/// Asserts the body carries at least one byte.
///
/// # Errors
///
/// Returns [`AssertionError::EmptyBody`] otherwise.
pub fn expect_non_empty_body(response: &ApiResponse) -> Result<(), AssertionError> {
    if response.body_len() == 0 {
        return Err(AssertionError::EmptyBody);
    }
    Ok(())
}

// ============================================================================
// SECTION: JSON Assertions
// ============================================================================

/// Asserts `actual` contains `expected` recursively.
///
/// # Errors
///
/// Returns the first mismatch found in document order.
pub fn expect_contains(actual: &Value, expected: &Value) -> Result<(), AssertionError> {
    contains_at(actual, expected, &mut String::new())
}

/// Asserts `actual` equals `expected` exactly.
///
/// # Errors
///
/// Returns the first difference found in document order.
pub fn expect_equal(actual: &Value, expected: &Value) -> Result<(), AssertionError> {
    equal_at(actual, expected, &mut String::new())
}

/// Asserts every named field is present on an object.
///
/// # Errors
///
/// Returns [`AssertionError::MissingFields`] naming every absent field.
pub fn expect_fields(actual: &Value, names: &[&str]) -> Result<(), AssertionError> {
    let Value::Object(map) = actual else {
        return Err(type_error("", "object", actual));
    };
    let missing: Vec<String> =
        names.iter().filter(|name| !map.contains_key(**name)).map(|name| (*name).to_string()).collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AssertionError::MissingFields {
        fields: missing,
    })
}

/// Asserts the value is an array and returns its elements.
///
/// # Errors
///
/// Returns [`AssertionError::Type`] when it is not.
pub fn expect_array(actual: &Value) -> Result<&[Value], AssertionError> {
    match actual {
        Value::Array(items) => Ok(items),
        other => Err(type_error("", "array", other)),
    }
}

/// Asserts the value is an array of exactly `len` elements.
///
/// # Errors
///
/// Returns [`AssertionError::Length`] or [`AssertionError::Type`].
pub fn expect_array_len(actual: &Value, len: usize) -> Result<&[Value], AssertionError> {
    let items = expect_array(actual)?;
    if items.len() != len {
        return Err(AssertionError::Length {
            pointer: String::new(),
            expected: len,
            actual: items.len(),
        });
    }
    Ok(items)
}

/// Asserts a top-level field matches `expected` by containment.
///
/// # Errors
///
/// Returns [`AssertionError::MissingKey`] or the nested mismatch.
pub fn expect_field_eq(actual: &Value, field: &str, expected: &Value) -> Result<(), AssertionError> {
    let mut pointer = String::new();
    push_token(&mut pointer, field);
    let value = actual.get(field).ok_or_else(|| AssertionError::MissingKey {
        pointer: pointer.clone(),
    })?;
    contains_at(value, expected, &mut pointer)
}

/// Asserts every array element carries `field` matching `expected`.
///
/// # Errors
///
/// Returns the first element mismatch with its index in the pointer.
pub fn expect_each_field_eq(
    actual: &Value,
    field: &str,
    expected: &Value,
) -> Result<(), AssertionError> {
    for (index, item) in expect_array(actual)?.iter().enumerate() {
        let mut pointer = String::new();
        push_token(&mut pointer, &index.to_string());
        push_token(&mut pointer, field);
        let value = item.get(field).ok_or_else(|| AssertionError::MissingKey {
            pointer: pointer.clone(),
        })?;
        contains_at(value, expected, &mut pointer)?;
    }
    Ok(())
}

/// Asserts the vendor error body's `Message` equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Message`] with the actual message, if any.
pub fn expect_message(actual: &Value, expected: &str) -> Result<(), AssertionError> {
    let message = actual.get("Message").and_then(Value::as_str);
    if message == Some(expected) {
        return Ok(());
    }
    Err(AssertionError::Message {
        expected: expected.to_string(),
        actual: message.map(str::to_string),
    })
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Recursive containment check tracking the current pointer.
fn contains_at(actual: &Value, expected: &Value, pointer: &mut String) -> Result<(), AssertionError> {
    match (actual, expected) {
        (Value::Object(actual_map), Value::Object(expected_map)) => {
            for (key, expected_value) in expected_map {
                let base = pointer.len();
                push_token(pointer, key);
                let Some(actual_value) = actual_map.get(key) else {
                    return Err(AssertionError::MissingKey {
                        pointer: pointer.clone(),
                    });
                };
                contains_at(actual_value, expected_value, pointer)?;
                pointer.truncate(base);
            }
            Ok(())
        }
        (Value::Array(actual_items), Value::Array(expected_items)) => {
            if actual_items.len() != expected_items.len() {
                return Err(AssertionError::Length {
                    pointer: pointer.clone(),
                    expected: expected_items.len(),
                    actual: actual_items.len(),
                });
            }
            for (index, (actual_item, expected_item)) in
                actual_items.iter().zip(expected_items).enumerate()
            {
                let base = pointer.len();
                push_token(pointer, &index.to_string());
                contains_at(actual_item, expected_item, pointer)?;
                pointer.truncate(base);
            }
            Ok(())
        }
        _ => scalar_eq(actual, expected, pointer),
    }
}

/// Recursive exact equality tracking the current pointer.
fn equal_at(actual: &Value, expected: &Value, pointer: &mut String) -> Result<(), AssertionError> {
    if let (Value::Object(actual_map), Value::Object(expected_map)) = (actual, expected) {
        for (key, expected_value) in expected_map {
            let base = pointer.len();
            push_token(pointer, key);
            let Some(actual_value) = actual_map.get(key) else {
                return Err(AssertionError::MissingKey {
                    pointer: pointer.clone(),
                });
            };
            equal_at(actual_value, expected_value, pointer)?;
            pointer.truncate(base);
        }
        if let Some(extra) = actual_map.keys().find(|key| !expected_map.contains_key(*key)) {
            push_token(pointer, extra);
            return Err(AssertionError::UnexpectedKey {
                pointer: pointer.clone(),
            });
        }
        return Ok(());
    }
    if let (Value::Array(actual_items), Value::Array(expected_items)) = (actual, expected) {
        if actual_items.len() != expected_items.len() {
            return Err(AssertionError::Length {
                pointer: pointer.clone(),
                expected: expected_items.len(),
                actual: actual_items.len(),
            });
        }
        for (index, (actual_item, expected_item)) in actual_items.iter().zip(expected_items).enumerate()
        {
            let base = pointer.len();
            push_token(pointer, &index.to_string());
            equal_at(actual_item, expected_item, pointer)?;
            pointer.truncate(base);
        }
        return Ok(());
    }
    scalar_eq(actual, expected, pointer)
}

/// Compares non-container values; numbers compare numerically.
fn scalar_eq(actual: &Value, expected: &Value, pointer: &str) -> Result<(), AssertionError> {
    let equal = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
        _ => actual == expected,
    };
    if equal {
        return Ok(());
    }
    Err(AssertionError::Mismatch {
        pointer: pointer.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Numeric equality across integer and float representations.
fn numbers_eq(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() <= f64::EPSILON * x.abs().max(y.abs()).max(1.0),
        _ => false,
    }
}

/// Appends an escaped JSON pointer token.
fn push_token(pointer: &mut String, token: &str) {
    pointer.push('/');
    for ch in token.chars() {
        match ch {
            '~' => pointer.push_str("~0"),
            '/' => pointer.push_str("~1"),
            other => pointer.push(other),
        }
    }
}

/// Builds a type error for the value at `pointer`.
fn type_error(pointer: &str, expected: &'static str, actual: &Value) -> AssertionError {
    AssertionError::Type {
        pointer: pointer.to_string(),
        expected,
        actual: kind_of(actual),
    }
}

/// Names a JSON value's type.
const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Short body rendering for status failures.
fn body_excerpt(body: &ResponseBody) -> String {
    let full = match body {
        ResponseBody::Empty => return "<empty>".to_string(),
        ResponseBody::Json(value) => value.to_string(),
        ResponseBody::Text(text) => text.clone(),
        ResponseBody::Binary(bytes) => return format!("<{} bytes>", bytes.len()),
    };
    if full.chars().count() <= BODY_EXCERPT_CHARS {
        return full;
    }
    let mut excerpt: String = full.chars().take(BODY_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}
