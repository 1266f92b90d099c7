//! Tool Response Shape
//!
//! Every operation, in either mode, answers with a [`ToolResponse`]: a list of
//! text content blocks plus an `isError` flag. Successful results carry one
//! block of pretty-printed JSON; failures carry one plain-text block whose
//! prefix names the error class.
//!
//! # Output Contract
//! - Data: `{"content": [{"type": "text", "text": "<json>"}], "isError": false}`
//! - No data: `"No matching data: ..."`, not an error
//! - Input error: `"Input error: ..."`
//! - Unexpected failure: `"Error: An unexpected error occurred ..."`
//! - Unknown operation: `"Unknown operation: ..."`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GateError, Result};
use crate::normalize::Record;

/// Prefix for caller-correctable errors
pub const INPUT_ERROR_PREFIX: &str = "Input error: ";
/// Prefix for the empty-result marker
pub const NO_DATA_PREFIX: &str = "No matching data: ";
/// Prefix for unknown operation names
pub const UNKNOWN_OPERATION_PREFIX: &str = "Unknown operation: ";
/// Text returned for every unexpected failure
pub const GENERIC_FAILURE: &str =
    "Error: An unexpected error occurred while processing the request. Please try again later.";

/// Result of a successful handler run, before packaging
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// JSON payload: list of records, single record, or summary object
    Data(Value),
    /// Nothing matched; the message says what was looked for
    NoData(String),
}

impl Outcome {
    /// Records as a JSON list, or [`Outcome::NoData`] when empty
    pub fn records(records: Vec<Record>, empty: impl Into<String>) -> Self {
        if records.is_empty() {
            Self::NoData(empty.into())
        } else {
            Self::Data(Value::Array(records.into_iter().map(Value::Object).collect()))
        }
    }

    /// Any serializable summary
    pub fn summary(value: impl Serialize) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Data)
            .map_err(|e| GateError::internal(format!("summary could not be encoded: {e}")))
    }
}

/// Text content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// Always `"text"`
    #[serde(rename = "type")]
    pub content_type: String,

    pub text: String,
}

impl TextContent {
    /// Create a new text content block
    pub fn new(text: impl Into<String>) -> Self {
        Self { content_type: "text".to_string(), text: text.into() }
    }
}

/// Outbound response for one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<TextContent>,

    /// True for error responses; the empty-result marker is not an error
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    fn single(text: impl Into<String>, is_error: bool) -> Self {
        Self { content: vec![TextContent::new(text)], is_error }
    }

    /// Package a handler outcome
    #[must_use]
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Data(value) => Self::single(format!("{value:#}"), false),
            Outcome::NoData(message) => Self::no_data(message),
        }
    }

    /// Explicit empty-result marker
    pub fn no_data(message: impl AsRef<str>) -> Self {
        Self::single(format!("{NO_DATA_PREFIX}{}", message.as_ref()), false)
    }

    /// Caller-correctable problem with the request
    pub fn input_error(message: impl AsRef<str>) -> Self {
        Self::single(format!("{INPUT_ERROR_PREFIX}{}", message.as_ref()), true)
    }

    /// Database error text the caller is allowed to see (raw mode only)
    pub fn error(message: impl AsRef<str>) -> Self {
        Self::single(format!("Error: {}", message.as_ref()), true)
    }

    /// Schema-free failure message
    #[must_use]
    pub fn failure() -> Self {
        Self::single(GENERIC_FAILURE, true)
    }

    /// Name not in the catalog
    pub fn unknown_operation(name: impl AsRef<str>) -> Self {
        Self::single(format!("{UNKNOWN_OPERATION_PREFIX}{}", name.as_ref()), true)
    }

    /// Concatenated text of all content blocks
    #[must_use]
    pub fn text(&self) -> String {
        self.content.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n")
    }

    /// Parse the first content block back into JSON, if it is JSON
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        self.content.first().and_then(|c| serde_json::from_str(&c.text).ok())
    }
}
