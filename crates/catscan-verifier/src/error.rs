use thiserror::Error;

use crate::verifier::VerifierState;

#[derive(Debug, Error)]
pub enum VerifierError {
    /// `start` was called while the verifier was not stopped.
    #[error("verifier cannot start from state {0:?}")]
    NotStopped(VerifierState),

    /// `start` was called outside a tokio runtime.
    #[error("verifier must be started inside a tokio runtime")]
    NoRuntime,

    #[error("invalid verifier configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),
}

pub type VerifierResult<T> = Result<T, VerifierError>;
