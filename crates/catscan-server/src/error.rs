use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catscan_sdk::SdkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or wrong `auth` query parameter.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// The ingestion queue no longer accepts work.
    #[error("Service is shutting down")]
    Unavailable,

    #[error("{0}")]
    Internal(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Map a failed sampling call onto the `/random` responses.
pub(crate) fn random_error(err: SdkError) -> ServerError {
    match err {
        SdkError::InvalidCount(_) => {
            ServerError::BadRequest("Invalid count parameter. Must be between 1 and 10.")
        }
        SdkError::InvalidEntry(_) => ServerError::BadRequest("Invalid extension format"),
        _ => ServerError::NotFound("No entries found"),
    }
}
