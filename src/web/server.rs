//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::{Result, StudyOlleError};

use super::handlers::AppState;
use super::router::create_router;

/// Serves the application router.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a server for the configured host and port.
    pub fn new(config: &ServerConfig, app_state: AppState) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                StudyOlleError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            cors_origins: config.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.addr;
        self.run_with_addr(addr).await
    }

    /// Run the server on `addr`.
    pub async fn run_with_addr(self, addr: SocketAddr) -> Result<()> {
        let router = create_router(self.app_state, &self.cors_origins);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Web server listening on {}", addr);

        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::Database;
    use crate::mail::InMemoryEmailSender;
    use crate::web::session::SessionKeys;

    async fn app_state() -> (Database, AppState) {
        let db = Database::open_in_memory().await.unwrap();
        let state = AppState::new(
            db.pool().clone(),
            Arc::new(InMemoryEmailSender::new()),
            Arc::new(SystemClock),
            "http://localhost:8080",
            SessionKeys::new("test-secret", 3600, false),
        );
        (db, state)
    }

    #[tokio::test]
    async fn test_server_address() {
        let (_db, state) = app_state().await;
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 18080,
            ..Default::default()
        };
        let server = WebServer::new(&config, state).unwrap();
        assert_eq!(server.addr().to_string(), "127.0.0.1:18080");
    }

    #[tokio::test]
    async fn test_invalid_address_is_config_error() {
        let (_db, state) = app_state().await;
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WebServer::new(&config, state),
            Err(StudyOlleError::Config(_))
        ));
    }
}
