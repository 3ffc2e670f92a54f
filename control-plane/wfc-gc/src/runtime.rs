use std::net::SocketAddr;
use std::sync::Arc;

use kube::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::GcConfig,
    gc::{
        GarbageCollector, KubeJobStore, KubeWorkflowStore, NoCache,
        WorkflowCache, WorkflowMirror,
    },
    web::{WebState, run_http_server},
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &GcConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Start the Workflow mirror, or the pass-through cache when disabled.
pub fn spawn_cache(
    client: Client,
    cfg: &GcConfig,
    token: CancellationToken,
) -> (Arc<dyn WorkflowCache>, Option<JoinHandle<()>>) {
    if !cfg.cache_enabled {
        info!("workflow mirror disabled; resolving every workflow with a direct read");
        return (Arc::new(NoCache), None);
    }
    let (mirror, handle) =
        WorkflowMirror::spawn(client, cfg.namespace.as_deref(), token);
    (Arc::new(mirror), Some(handle))
}

pub fn build_collector(
    client: Client,
    cfg: &GcConfig,
    cache: Arc<dyn WorkflowCache>,
) -> GarbageCollector {
    GarbageCollector::new(
        cfg,
        Arc::new(KubeJobStore::new(client.clone())),
        Arc::new(KubeWorkflowStore::new(client)),
        cache,
    )
}

/// Run mirror, collector loop and HTTP server until a shutdown signal.
pub async fn run_all(client: Client, cfg: GcConfig) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    let (cache, mirror) = spawn_cache(client.clone(), &cfg, token.clone());
    let gc = Arc::new(build_collector(client, &cfg, cache.clone()));

    let mut http = tokio::spawn(run_http_server(
        compute_http_addr(&cfg),
        WebState {
            cache,
            last_report: gc.last_report(),
        },
        token.clone(),
    ));
    let collector = tokio::spawn(gc.run(token.clone()));

    // The HTTP server only returns early on failure (e.g. port in use).
    let http_res = tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown requested");
            None
        }
        res = &mut http => Some(res),
    };
    token.cancel();

    collector.await?;
    if let Some(mirror) = mirror {
        mirror.await?;
    }
    match http_res {
        Some(res) => res?,
        None => http.await?,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        )
        .expect("failed to install signal handler")
        .recv()
        .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
