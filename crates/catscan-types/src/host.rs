use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::TypeError;

/// Base URL of the public file host.
pub const DEFAULT_FILE_HOST: &str = "https://files.catbox.moe";

/// Remote file host that entries resolve against.
///
/// A `FileHost` is an `http` or `https` base URL without a trailing slash.
/// The location of an entry is `<base>/<identifier>.<extension>`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileHost {
    base: String,
}

impl FileHost {
    /// Parse a base URL such as `https://files.catbox.moe`.
    pub fn parse(base: impl Into<String>) -> Result<Self, TypeError> {
        let raw = base.into();
        let trimmed = raw.trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| TypeError::InvalidFileHost(raw.clone()))?;
        if rest.is_empty() || rest.contains(char::is_whitespace) {
            return Err(TypeError::InvalidFileHost(raw));
        }
        Ok(Self {
            base: trimmed.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Fully-qualified remote location of `entry`.
    pub fn location(&self, entry: &Entry) -> String {
        format!("{}/{}", self.base, entry.file_name())
    }
}

impl Default for FileHost {
    fn default() -> Self {
        Self {
            base: DEFAULT_FILE_HOST.to_string(),
        }
    }
}

impl TryFrom<String> for FileHost {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FileHost> for String {
    fn from(host: FileHost) -> Self {
        host.base
    }
}

impl fmt::Display for FileHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

impl fmt::Debug for FileHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHost({})", self.base)
    }
}
