//! # HTTP Server
//!
//! Serves a `DocumentStore` over HTTP until Ctrl-C, then closes the store.

use std::io;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::observability::{log_event, Event, Logger};
use crate::store::DocumentStore;

use super::config::HttpServerConfig;
use super::document_routes::{document_routes, DocumentState};
use super::observability_routes::health_routes;

pub struct HttpServer {
    config: HttpServerConfig,
    store: Arc<DocumentStore>,
    router: Router,
}

impl HttpServer {
    pub fn with_config(config: HttpServerConfig, store: Arc<DocumentStore>) -> Self {
        let router = Self::build_router(&config, Arc::clone(&store));
        Self {
            config,
            store,
            router,
        }
    }

    fn build_router(config: &HttpServerConfig, store: Arc<DocumentStore>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let documents = Arc::new(DocumentState::new(store, config.clone()));

        Router::new()
            .merge(health_routes())
            .merge(document_routes(documents))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds and serves until Ctrl-C, then closes the store.
    pub async fn start(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        let local = listener.local_addr()?.to_string();
        log_event(
            Event::ServerListening,
            &[("addr", &local), ("db", self.store.connection())],
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        log_event(Event::ServerStopped, &[("addr", &local)]);
        if let Err(e) = self.store.close() {
            Logger::error(
                Event::StoreClose.as_str(),
                &[("code", e.code()), ("error", &e.to_string())],
            );
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        Logger::warn(
            Event::ServerStopped.as_str(),
            &[("error", &e.to_string()), ("reason", "signal handler failed")],
        );
        // Without a handler, serve until the process is killed.
        std::future::pending::<()>().await;
    }
}
