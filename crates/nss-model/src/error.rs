//! Flat-line parse errors.

use thiserror::Error;

/// Errors raised when a flat `passwd`/`group`/`shadow` line cannot be parsed
/// or a record cannot be rendered as one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRecordError {
    /// The line does not have the expected number of colon-separated fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Number of fields the format requires.
        expected: usize,
        /// Number of fields present in the line.
        found: usize,
    },

    /// A numeric field holds something other than a decimal integer.
    #[error("invalid {field}: {value:?}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw field value.
        value: String,
    },

    /// An id field is zero, which the gateway never serves.
    #[error("{0} must be non-zero")]
    ZeroId(&'static str),

    /// A text field holds a character that would split the line.
    #[error("{field} contains a delimiter: {value:?}")]
    UnsafeField {
        /// Field name.
        field: &'static str,
        /// Raw field value.
        value: String,
    },
}

/// Result type for flat-line parsing and rendering.
pub type ParseResult<T> = Result<T, ParseRecordError>;
