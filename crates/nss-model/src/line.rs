//! Shared helpers for colon-delimited lines.

use crate::error::{ParseRecordError, ParseResult};

/// Splits a flat line into exactly `N` colon-separated fields.
///
/// A single trailing newline is ignored.
pub(crate) fn split_fields<const N: usize>(line: &str) -> ParseResult<[&str; N]> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let parts: Vec<&str> = line.split(':').collect();
    let found = parts.len();
    parts
        .try_into()
        .map_err(|_| ParseRecordError::FieldCount { expected: N, found })
}

/// Characters that end a field or a line.
const FIELD_DELIMITERS: [char; 3] = [':', '\n', '\r'];

/// Rejects text that would add fields or lines when rendered.
pub(crate) fn check_field(field: &'static str, value: &str) -> ParseResult<()> {
    if value.contains(FIELD_DELIMITERS) {
        return Err(ParseRecordError::UnsafeField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Whether `value` can sit in a comma-separated member list.
pub(crate) fn is_safe_member(value: &str) -> bool {
    !value.contains(FIELD_DELIMITERS) && !value.contains(',')
}

/// Parses a non-zero numeric id.
pub(crate) fn parse_id(field: &'static str, value: &str) -> ParseResult<u32> {
    let id: u32 = value.parse().map_err(|_| ParseRecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;
    if id == 0 {
        return Err(ParseRecordError::ZeroId(field));
    }
    Ok(id)
}
