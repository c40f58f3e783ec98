//! Distinguished Name parsing (RFC 4514 string form).
//!
//! Only what the mapper needs: split a DN into RDNs and attribute/value
//! pairs, undoing escapes. Multi-valued RDNs (`uid=a+cn=b`) are supported.

use thiserror::Error;

/// DN parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// An attribute/value pair has no `=`.
    #[error("missing '=' in {0:?}")]
    MissingEquals(String),

    /// An attribute type is empty.
    #[error("empty attribute type")]
    EmptyType,

    /// A backslash is followed by something that is neither a special
    /// character nor two hex digits.
    #[error("invalid escape sequence")]
    InvalidEscape,

    /// Unescaped bytes do not form valid UTF-8.
    #[error("value is not valid UTF-8")]
    InvalidUtf8,
}

/// One `type=value` pair of an RDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTypeAndValue {
    /// Attribute type, e.g. `uid`.
    pub attr_type: String,
    /// Unescaped value.
    pub value: String,
}

/// A relative distinguished name.
pub type Rdn = Vec<AttributeTypeAndValue>;

/// Parses a DN into its RDNs, most specific first.
///
/// The empty string parses to an empty DN.
pub fn parse_dn(dn: &str) -> Result<Vec<Rdn>, DnError> {
    let mut rdns = Vec::new();
    if dn.trim().is_empty() {
        return Ok(rdns);
    }

    let mut rdn = Rdn::new();
    let mut component = String::new();
    let mut chars = dn.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Keep escapes intact; they are resolved per value below.
                component.push('\\');
                match chars.next() {
                    Some(next) => component.push(next),
                    None => return Err(DnError::InvalidEscape),
                }
            }
            '+' => {
                rdn.push(parse_pair(&component)?);
                component.clear();
            }
            ',' | ';' => {
                rdn.push(parse_pair(&component)?);
                component.clear();
                rdns.push(std::mem::take(&mut rdn));
            }
            _ => component.push(c),
        }
    }
    rdn.push(parse_pair(&component)?);
    rdns.push(rdn);

    Ok(rdns)
}

/// Returns the value of the first RDN attribute whose type matches
/// `attr_type` (case-insensitive).
///
/// Malformed DNs and DNs without the attribute yield `None`.
#[must_use]
pub fn extract_attribute(dn: &str, attr_type: &str) -> Option<String> {
    let rdns = parse_dn(dn).ok()?;
    rdns.into_iter()
        .flatten()
        .find(|atv| atv.attr_type.eq_ignore_ascii_case(attr_type))
        .map(|atv| atv.value)
}

fn parse_pair(component: &str) -> Result<AttributeTypeAndValue, DnError> {
    let (attr_type, raw_value) = component
        .split_once('=')
        .ok_or_else(|| DnError::MissingEquals(component.trim().to_string()))?;

    let attr_type = attr_type.trim();
    if attr_type.is_empty() {
        return Err(DnError::EmptyType);
    }

    Ok(AttributeTypeAndValue {
        attr_type: attr_type.to_string(),
        value: unescape_value(raw_value.trim_start())?,
    })
}

fn unescape_value(raw: &str) -> Result<String, DnError> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    // Trailing unescaped spaces are insignificant; escaped ones are kept.
    let mut significant_len = 0;

    while let Some(c) = chars.next() {
        if c == '\\' {
            let first = chars.next().ok_or(DnError::InvalidEscape)?;
            if first.is_ascii_hexdigit() {
                let second = chars
                    .next()
                    .filter(char::is_ascii_hexdigit)
                    .ok_or(DnError::InvalidEscape)?;
                let hex = [first as u8, second as u8];
                let hex = std::str::from_utf8(&hex).map_err(|_| DnError::InvalidEscape)?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| DnError::InvalidEscape)?;
                bytes.push(byte);
            } else if is_special(first) {
                bytes.push(first as u8);
            } else {
                return Err(DnError::InvalidEscape);
            }
            significant_len = bytes.len();
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            if c != ' ' {
                significant_len = bytes.len();
            }
        }
    }

    bytes.truncate(significant_len);
    String::from_utf8(bytes).map_err(|_| DnError::InvalidUtf8)
}

/// Characters that may follow a backslash literally.
const fn is_special(c: char) -> bool {
    matches!(
        c,
        ' ' | '"' | '#' | '+' | ',' | ';' | '<' | '=' | '>' | '\\'
    )
}
