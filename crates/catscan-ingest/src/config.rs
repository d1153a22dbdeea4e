use serde::{Deserialize, Serialize};

/// Configuration for the [`IngestionQueue`](crate::IngestionQueue).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending commands before producers block.
    pub capacity: usize,
    /// Name given to the writer thread.
    pub thread_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            thread_name: "catscan-writer".into(),
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }
}
