//! filter-mux demo server
//!
//! Serves a small route table through `ServeMux` so the trie, the filter
//! chain and the context helpers can be exercised with curl.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ HttpServer (axum: trace, timeout)
//!                        │
//!                        ├── /healthz ──▶ Endpoint (GET only)
//!                        │
//!                        └── fallback ──▶ ServeMux
//!                                           │  PathTree lookup
//!                                           ▼
//!                                  request_id → access_log     (default filters)
//!                                           ▼
//!                                  route filters → handler
//!                                           ▼
//!     Client Response ◀────────────── ResponseWriter
//! ```

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::Router;
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use filter_mux::config::{load_config, MuxConfig};
use filter_mux::http::endpoint;
use filter_mux::lifecycle::signals::spawn_signal_handler;
use filter_mux::observability::logging;
use filter_mux::{access_log, filter, request_id, Context, HttpServer, ServeMux, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "filter-mux", version, about = "Path-trie HTTP multiplexer demo")]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "filter-mux starting");

    let mux = demo_mux();
    let routes = Router::new().route_service(
        "/healthz",
        endpoint::get(|ctx: &mut Context| ctx.write_json(&json!({ "status": "ok" })), []),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    HttpServer::with_routes(config, mux, routes)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_mux() -> ServeMux {
    let mut mux = ServeMux::new();
    mux.add_filters([request_id(), access_log()]);

    mux.handle("/", |ctx| ctx.write_string("filter-mux"), []);

    mux.handle(
        "/api/v1/user",
        |ctx| {
            let page = ctx.query("page").unwrap_or("1").to_string();
            ctx.write_json(&json!({ "users": [], "page": page }));
        },
        [],
    );

    mux.handle(
        "/api/v1/user/",
        |ctx| ctx.write_string("user index"),
        [],
    );

    let require_token = filter(|ctx| {
        if ctx.headers().contains_key("authorization") {
            ctx.next();
        } else {
            ctx.write_status(StatusCode::UNAUTHORIZED);
            ctx.write_string("missing authorization");
        }
    });
    mux.handle(
        "/api/v1/{:user}/add",
        |ctx| {
            let user = ctx.path_param("user").unwrap_or_default().to_string();
            let item = ctx.param("item").unwrap_or_default().to_string();
            ctx.write(format_args!("added {item} for {user}"));
        },
        [require_token],
    );

    mux.handle(
        "/echo",
        |ctx| match ctx.body_as_json::<Greeting>() {
            Ok(greeting) => ctx.write_json(&json!({ "hello": greeting.name })),
            Err(err) => {
                ctx.write_status(StatusCode::BAD_REQUEST);
                ctx.write_string(&err.to_string());
            }
        },
        [],
    );

    mux.handle("/panic", |_ctx| panic!("demo handler panicked"), []);

    mux
}
