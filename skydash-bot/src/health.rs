//! Static status page for the hosting platform's liveness probe.

use anyhow::Context;
use axum::{Router, response::Html, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

const STATUS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>SkyDash</title></head>
<body>
<h1>SkyDash is running</h1>
<p>The Discord weather bot is online.</p>
</body>
</html>
"#;

pub fn router() -> Router {
    Router::new().route("/", get(status_page))
}

async fn status_page() -> Html<&'static str> {
    Html(STATUS_PAGE)
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health server to {addr}"))?;

    info!("Health page listening on http://{addr}");
    axum::serve(listener, router())
        .await
        .context("Health server stopped")
}
