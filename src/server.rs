//! Static file server for local development.
//!
//! Serves a directory (typically the one holding `questions.json`) so a
//! browser client running on another origin can fetch it.
//!
//! # Headers
//!
//! Every response, including errors, carries:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Access-Control-Allow-Origin` | `*` |
//! | `Access-Control-Allow-Methods` | `GET, OPTIONS` |
//! | `Cache-Control` | `no-store, no-cache, must-revalidate` |
//!
//! `OPTIONS` requests on any path are answered with `200` and an empty body.

use anyhow::Context;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

const ALLOWED_METHODS: &str = "GET, OPTIONS";
const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

/// Builds the router serving `dir`.
pub fn build_router(dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(middleware::from_fn(answer_options))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
}

async fn answer_options(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}

/// Binds `0.0.0.0:<port>` and serves `dir` until Ctrl-C.
///
/// This is the entry point used by `qagg serve`.
pub async fn run_server(dir: &Path, port: u16) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    println!(
        "Serving {} with CORS at http://localhost:{}",
        dir.display(),
        port
    );

    serve(listener, dir.to_path_buf(), shutdown_signal()).await?;
    println!("\nStopping server...");
    Ok(())
}

/// Serves `dir` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    dir: PathBuf,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, dir = %dir.display(), "static server listening");
    }
    let app = build_router(&dir);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
