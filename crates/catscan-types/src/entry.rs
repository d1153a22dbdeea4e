use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest extension accepted by [`Extension::filter`].
pub const MAX_FILTER_LEN: usize = 10;

/// Token naming one remotely hosted file.
///
/// Identifiers are unique across the registry. The only structural rule
/// enforced here is that they are non-empty; the remote host decides what a
/// well-formed identifier looks like (observed: six alphanumerics).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap an identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

/// File type suffix of a remote file, without the leading dot.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(String);

impl Extension {
    /// Validate and wrap an extension supplied for ingestion.
    ///
    /// Ingestion only rejects empty values.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::EmptyExtension);
        }
        Ok(Self(value))
    }

    /// Validate an extension used to filter sampling reads.
    ///
    /// Filters must be 1 to [`MAX_FILTER_LEN`] ASCII alphanumerics.
    pub fn filter(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if !Self::is_valid_filter(&value) {
            return Err(TypeError::InvalidExtensionFilter(value));
        }
        Ok(Self(value))
    }

    /// Returns `true` if `value` matches `^[A-Za-z0-9]{1,10}$`.
    pub fn is_valid_filter(value: &str) -> bool {
        (1..=MAX_FILTER_LEN).contains(&value.len())
            && value.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Extension {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Extension> for String {
    fn from(ext: Extension) -> Self {
        ext.0
    }
}

impl AsRef<str> for Extension {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({})", self.0)
    }
}

/// A registry record: one remote file named by identifier and extension.
///
/// Entries are immutable once constructed. Equality covers both fields, but
/// the registry deduplicates on [`Identifier`] alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "id")]
    identifier: Identifier,
    #[serde(rename = "ext")]
    extension: Extension,
}

impl Entry {
    /// Build an entry from raw strings, rejecting empty fields.
    pub fn new(identifier: impl Into<String>, extension: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self {
            identifier: Identifier::new(identifier)?,
            extension: Extension::new(extension)?,
        })
    }

    pub fn from_parts(identifier: Identifier, extension: Extension) -> Self {
        Self { identifier, extension }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    /// Remote file name: `<identifier>.<extension>`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.identifier, self.extension)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.identifier, self.extension)
    }
}
