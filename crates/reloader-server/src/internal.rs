use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use reloader_metrics::ReloaderMetrics;
use reloader_shutdown::{recv_shutdown, ShutdownSignal};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// 内部 HTTP 服务：`/metrics` 与 `/healthz`
pub fn create_router(metrics: Arc<ReloaderMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health))
        .with_state(metrics)
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_handler(State(metrics): State<Arc<ReloaderMetrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], metrics.gather())
}

/// 监听 `addr`，收到关闭信号后停止
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<ReloaderMetrics>,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Internal server listening on http://{}", addr);

    axum::serve(listener, create_router(metrics))
        .with_graceful_shutdown(async move {
            recv_shutdown(&mut shutdown).await;
        })
        .await?;

    info!("Internal server stopped");
    Ok(())
}
