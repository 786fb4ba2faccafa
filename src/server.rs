//! Pull endpoint rendering the shared registry

use crate::metrics::MetricsRegistry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Routes of the exposition server
pub fn router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/", get(handle_index))
        .with_state(registry)
}

pub(crate) async fn handle_metrics(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub(crate) async fn handle_index() -> &'static str {
    "Kubernetes storage metrics exporter. Metrics are served at /metrics.\n"
}

/// Serve `/metrics` on all interfaces until the listener fails
pub async fn serve(port: u16, registry: Arc<MetricsRegistry>) -> std::io::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting server listening on :{}", port);
    axum::serve(listener, router(registry)).await
}
