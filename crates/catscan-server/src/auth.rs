use crate::error::{ServerError, ServerResult};

/// Shared secret guarding the write and sampling endpoints.
#[derive(Clone)]
pub struct AuthKey(String);

impl AuthKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Accept only an exact match. A missing key is treated as empty.
    pub fn verify(&self, presented: Option<&str>) -> ServerResult<()> {
        if presented.unwrap_or_default() == self.0 {
            Ok(())
        } else {
            Err(ServerError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthKey(..)")
    }
}
