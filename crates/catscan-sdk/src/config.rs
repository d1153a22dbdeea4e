use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use catscan_ingest::QueueConfig;
use catscan_store::SqliteStoreConfig;
use catscan_types::FileHost;
use catscan_verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Dotenv file [`CatscanConfig::load`] reads from the working directory.
pub const DOTENV_FILE: &str = ".env";

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared secret expected in the `auth` query parameter.
    pub auth_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6969)),
            auth_key: "omgwow".into(),
        }
    }
}

/// Complete process configuration.
///
/// Built from defaults, then an optional TOML file, then environment
/// overrides taken from the process or a `.env` file. Every section may be
/// omitted from the file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatscanConfig {
    pub server: ServerConfig,
    pub store: SqliteStoreConfig,
    pub ingest: QueueConfig,
    pub verifier: VerifierConfig,
}

impl CatscanConfig {
    /// Load from `path` (if given), apply environment overrides, and
    /// validate. Overrides come from the process, then from [`DOTENV_FILE`].
    pub fn load(path: Option<&Path>) -> SdkResult<Self> {
        Self::load_with_dotenv(path, Path::new(DOTENV_FILE))
    }

    /// [`load`](Self::load) with an explicit dotenv file.
    ///
    /// A missing dotenv file is skipped. Its variables never override ones
    /// already set in the process, and the process environment is left
    /// untouched.
    pub fn load_with_dotenv(path: Option<&Path>, dotenv: &Path) -> SdkResult<Self> {
        let file_vars = read_dotenv(dotenv)?;
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Apply environment overrides read through `var`.
    ///
    /// Recognised variables: `CATSCAN_BIND` (full socket address), `PORT`
    /// (port only, applied after `CATSCAN_BIND`), `AUTH_KEY`, `DB_PATH`, and
    /// `FILE_HOST`.
    pub fn apply_env_with<F>(&mut self, var: F) -> SdkResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = var("CATSCAN_BIND") {
            self.server.bind_addr = bind
                .parse()
                .map_err(|_| SdkError::Config(format!("invalid CATSCAN_BIND: {bind}")))?;
        }
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| SdkError::Config(format!("invalid PORT: {port}")))?;
            self.server.bind_addr.set_port(port);
        }
        if let Some(key) = var("AUTH_KEY") {
            self.server.auth_key = key;
        }
        if let Some(path) = var("DB_PATH") {
            self.store.path = path.into();
        }
        if let Some(host) = var("FILE_HOST") {
            self.verifier.file_host = FileHost::parse(host)
                .map_err(|e| SdkError::Config(format!("invalid FILE_HOST: {e}")))?;
        }
        debug!(bind = %self.server.bind_addr, db = %self.store.path.display(), "configuration resolved");
        Ok(())
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.ingest.capacity == 0 {
            return Err(SdkError::Config("ingest.capacity must be greater than zero".into()));
        }
        if self.store.read_connections == 0 {
            return Err(SdkError::Config(
                "store.read_connections must be greater than zero".into(),
            ));
        }
        self.verifier
            .validate()
            .map_err(|e| SdkError::Config(e.to_string()))?;
        Ok(())
    }
}

fn read_dotenv(path: &Path) -> SdkResult<HashMap<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => {
            return Err(SdkError::Config(format!("failed to read {}: {e}", path.display())))
        }
    };
    let vars = iter
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| SdkError::Config(format!("invalid {}: {e}", path.display())))?;
    debug!(path = %path.display(), count = vars.len(), "loaded dotenv file");
    Ok(vars)
}
