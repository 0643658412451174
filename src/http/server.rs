//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the frozen `ServeMux` as the fallback of an Axum Router
//! - Mount any extra routes (e.g. method-guarded `Endpoint`s) in front of it
//! - Wire up middleware (tracing, request timeout)
//! - Serve with connect info so contexts can see the peer address
//! - Stop gracefully on the shutdown signal

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::MuxConfig;
use crate::http::mux::ServeMux;

pub struct HttpServer {
    router: Router,
    config: MuxConfig,
}

impl HttpServer {
    pub fn new(config: MuxConfig, mux: ServeMux) -> Self {
        Self::with_routes(config, mux, Router::new())
    }

    /// Serve `routes` first and hand everything else to `mux`.
    pub fn with_routes(config: MuxConfig, mux: ServeMux, routes: Router) -> Self {
        let router = Self::build_router(&config, mux, routes);
        Self { router, config }
    }

    #[allow(deprecated)]
    fn build_router(config: &MuxConfig, mut mux: ServeMux, routes: Router) -> Router {
        mux.set_body_limit(config.http.max_body_bytes);
        routes
            .fallback_service(mux.into_service())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.http.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum router, for embedding into another server.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
