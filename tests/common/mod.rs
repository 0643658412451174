//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use filter_mux::config::MuxConfig;
use filter_mux::{HttpServer, MuxService, ServeMux, Shutdown};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn request(method: Method, uri: &str, content_type: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Send one request through a frozen mux.
pub async fn send(service: &MuxService, req: Request<Body>) -> Response {
    service.clone().oneshot(req).await.unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start an `HttpServer` on an ephemeral port.
pub async fn start_server(mux: ServeMux, routes: Router) -> (SocketAddr, Shutdown) {
    let mut config = MuxConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        HttpServer::with_routes(config, mux, routes)
            .run(listener, rx)
            .await
            .unwrap();
    });

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
