use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::gc::{LastReport, WorkflowCache};

#[derive(Clone)]
pub struct WebState {
    pub cache: Arc<dyn WorkflowCache>,
    pub last_report: LastReport,
}

pub fn build_router(state: WebState) -> Router {
    // Expose both /health (preferred) and /healthz (legacy) for compatibility
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn readyz(State(state): State<WebState>) -> Response {
    if state.cache.has_synced() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "workflow mirror not synced")
            .into_response()
    }
}

async fn status(State(state): State<WebState>) -> Response {
    match state.last_report.read().await.as_ref() {
        Some(report) => Json(report.clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn run_http_server(
    addr: SocketAddr,
    state: WebState,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let app = build_router(state);
    info!("GC HTTP listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::{NoCache, Resolution, SweepReport};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    struct FlagCache(AtomicBool);

    impl WorkflowCache for FlagCache {
        fn has_synced(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
        fn lookup(&self, _: &str, _: &str) -> Resolution {
            Resolution::Inconclusive
        }
    }

    async fn get_status(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let code = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (code, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn readiness_follows_mirror_sync() {
        let cache = Arc::new(FlagCache(AtomicBool::new(false)));
        let state = WebState {
            cache: cache.clone(),
            last_report: Arc::new(RwLock::new(None)),
        };
        let (code, _) = get_status(build_router(state.clone()), "/readyz").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        cache.0.store(true, Ordering::SeqCst);
        let (code, _) = get_status(build_router(state), "/readyz").await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_last_pass() {
        let last_report: LastReport = Arc::new(RwLock::new(None));
        let state = WebState {
            cache: Arc::new(NoCache),
            last_report: last_report.clone(),
        };
        let (code, _) = get_status(build_router(state.clone()), "/status").await;
        assert_eq!(code, StatusCode::NO_CONTENT);

        *last_report.write().await = Some(SweepReport {
            children_seen: 3,
            ..Default::default()
        });
        let (code, body) = get_status(build_router(state.clone()), "/status").await;
        assert_eq!(code, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["children_seen"], 3);

        let (code, body) = get_status(build_router(state), "/healthz").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
