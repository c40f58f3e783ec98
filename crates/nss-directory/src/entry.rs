//! Raw directory entries.

use std::collections::HashMap;

use ldap3::SearchEntry;

/// A directory entry as returned by a search: the DN plus multi-valued
/// attributes.
///
/// Attribute names are matched case-insensitively, as LDAP attribute
/// descriptions are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Text attributes.
    pub attributes: HashMap<String, Vec<String>>,

    /// Attributes whose values were not valid UTF-8.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Adds a single-valued attribute.
    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_attrs(name, [value])
    }

    /// Adds a multi-valued attribute.
    #[must_use]
    pub fn with_attrs<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Gets all values of an attribute.
    #[must_use]
    pub fn get_attrs(&self, name: &str) -> &[String] {
        lookup(&self.attributes, name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Gets the first value of an attribute, or the empty string.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> &str {
        self.get_attrs(name).first().map_or("", String::as_str)
    }

    /// Gets the first value of an attribute, decoding binary values lossily.
    #[must_use]
    pub fn get_attr_lossy(&self, name: &str) -> String {
        let text = self.get_attr(name);
        if !text.is_empty() {
            return text.to_string();
        }
        lookup(&self.binary_attributes, name)
            .and_then(|values| values.first())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
