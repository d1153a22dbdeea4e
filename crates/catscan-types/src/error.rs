use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("extension must not be empty")]
    EmptyExtension,

    #[error("invalid extension filter: {0:?}")]
    InvalidExtensionFilter(String),

    #[error("invalid file host: {0}")]
    InvalidFileHost(String),
}
