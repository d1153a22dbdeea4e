use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// An identifier, extension, or extension filter failed validation.
    #[error("invalid entry: {0}")]
    InvalidEntry(#[from] catscan_types::TypeError),

    #[error("invalid count {0}: must be between 1 and {max}", max = crate::registry::MAX_RANDOM_LINKS)]
    InvalidCount(usize),

    /// A sample came back empty.
    #[error("no entries found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] catscan_store::StoreError),

    #[error("ingest error: {0}")]
    Ingest(#[from] catscan_ingest::IngestError),

    #[error("verifier error: {0}")]
    Verifier(#[from] catscan_verifier::VerifierError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
