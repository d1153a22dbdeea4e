//! HTTP server for catscan.
//!
//! Exposes the registry to submitters and consumers:
//!
//! - `POST /add?auth=KEY` -- queue an `{"id", "ext"}` entry for insertion
//! - `GET /count` -- number of registered entries
//! - `GET /random?auth=KEY&count=N&ext=EXT` -- up to ten random links
//!
//! Responses are plain text.

pub mod auth;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::AuthKey;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::CatscanServer;
