use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use catscan_sdk::{Registry, SdkError};
use serde::Deserialize;
use tracing::{debug, error};

use crate::auth::AuthKey;
use crate::error::{random_error, ServerError, ServerResult};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub auth: AuthKey,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, auth: AuthKey) -> Self {
        Self { registry, auth }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddParams {
    auth: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AddPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    ext: String,
}

/// `POST /add?auth=KEY` with body `{"id": "...", "ext": "..."}`.
pub async fn add_entry(
    State(state): State<AppState>,
    Query(params): Query<AddParams>,
    body: Bytes,
) -> ServerResult<String> {
    state.auth.verify(params.auth.as_deref())?;

    let payload: AddPayload =
        serde_json::from_slice(&body).map_err(|_| ServerError::BadRequest("Failed to parse JSON"))?;
    if payload.id.is_empty() || payload.ext.is_empty() {
        return Err(ServerError::BadRequest("Missing id or ext"));
    }

    match state.registry.ingest(&payload.id, &payload.ext).await {
        Ok(entry) => {
            debug!(identifier = %entry.identifier(), extension = %entry.extension(), "entry queued");
            Ok(format!("Entry added: ID={}, EXT={}", payload.id, payload.ext))
        }
        Err(SdkError::InvalidEntry(_)) => Err(ServerError::BadRequest("Missing id or ext")),
        Err(e) => {
            error!(error = %e, "failed to queue entry");
            Err(ServerError::Unavailable)
        }
    }
}

/// `GET /count`. Not authenticated.
pub async fn count(State(state): State<AppState>) -> ServerResult<String> {
    match state.registry.count().await {
        Ok(n) => Ok(n.to_string()),
        Err(e) => {
            error!(error = %e, "failed to count entries");
            Err(ServerError::Internal("Failed to retrieve total rows"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RandomParams {
    auth: Option<String>,
    count: Option<String>,
    ext: Option<String>,
}

/// `GET /random?auth=KEY&count=N&ext=EXT`, answering newline-separated links.
pub async fn random(
    State(state): State<AppState>,
    Query(params): Query<RandomParams>,
) -> ServerResult<String> {
    state.auth.verify(params.auth.as_deref())?;

    let count = match params.count.as_deref() {
        None | Some("") => 1,
        // Unparseable counts share the out-of-range response.
        Some(raw) => raw.parse::<usize>().unwrap_or(0),
    };
    let ext = params.ext.as_deref().filter(|e| !e.is_empty());

    let links = state
        .registry
        .random_links(count, ext)
        .await
        .map_err(|e| {
            if matches!(e, SdkError::Store(_)) {
                error!(error = %e, "failed to sample entries");
            }
            random_error(e)
        })?;
    Ok(links.join("\n"))
}
