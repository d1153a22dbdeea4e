use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use catscan_sdk::{Registry, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::AuthKey;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::build_router;

/// catscan HTTP server.
pub struct CatscanServer {
    config: ServerConfig,
    state: AppState,
}

impl CatscanServer {
    pub fn new(config: ServerConfig, registry: Arc<Registry>) -> Self {
        let state = AppState::new(registry, AuthKey::new(config.auth_key.clone()));
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        Ok(TcpListener::bind(self.config.bind_addr).await?)
    }

    /// Serve on the configured address until `shutdown` resolves, then
    /// finish in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!(%addr, "catscan server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("catscan server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use catscan_sdk::CatscanConfig;
    use catscan_store::InMemoryRegistryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::tests::AlwaysAlive;

    fn registry() -> Arc<Registry> {
        let registry = Registry::with_store(
            Arc::new(InMemoryRegistryStore::new()),
            Arc::new(AlwaysAlive),
            &CatscanConfig::default(),
        )
        .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn server_construction() {
        let r = registry();
        let server = CatscanServer::new(ServerConfig::default(), Arc::clone(&r));
        assert_eq!(server.config().bind_addr.port(), 6969);
        let _router = server.router();
        r.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn serves_until_shutdown_signal() {
        let r = registry();
        let server = CatscanServer::new(ServerConfig::default(), Arc::clone(&r));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve_on(listener, async {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /count HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("\r\n\r\n0"));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        r.shutdown().await.unwrap();
    }
}
