use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::crd::workflow::Workflow;

use super::types::Resolution;

/// Local, possibly stale view of the Workflows. Never does network I/O.
pub trait WorkflowCache: Send + Sync {
    /// Whether the view finished its initial list.
    fn has_synced(&self) -> bool;

    /// `Present` or `Absent` once synced, `Inconclusive` before. `Absent`
    /// is a hint only: the view lags the API server.
    fn lookup(&self, namespace: &str, name: &str) -> Resolution;
}

/// Reflector-backed mirror of the Workflow objects.
#[derive(Clone)]
pub struct WorkflowMirror {
    store: Store<Workflow>,
    synced: Arc<AtomicBool>,
}

impl WorkflowMirror {
    /// Wrap a store whose writer is driven elsewhere. Starts unsynced.
    pub fn new(store: Store<Workflow>) -> Self {
        Self {
            store,
            synced: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }

    /// Start watching Workflows (all namespaces unless `namespace` is set)
    /// and feed the mirror until `token` is cancelled.
    pub fn spawn(
        client: Client,
        namespace: Option<&str>,
        token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let api: Api<Workflow> = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        let (reader, writer) = reflector::store();
        let mirror = Self::new(reader);
        let handle_mirror = mirror.clone();
        let stream = watcher(api, watcher::Config::default())
            .default_backoff()
            .reflect(writer);

        let handle = tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            loop {
                tokio::select! {
                    ev = stream.next() => match ev {
                        Some(Ok(watcher::Event::InitDone)) => {
                            if !handle_mirror.has_synced() {
                                info!(
                                    size = handle_mirror.store.state().len(),
                                    "workflow mirror synced"
                                );
                            }
                            handle_mirror.mark_synced();
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "workflow watch error; backing off");
                        }
                        None => {
                            warn!("workflow watch stream ended");
                            break;
                        }
                    },
                    _ = token.cancelled() => {
                        debug!("workflow mirror cancelled");
                        break;
                    }
                }
            }
        });
        (mirror, handle)
    }
}

impl WorkflowCache for WorkflowMirror {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    fn lookup(&self, namespace: &str, name: &str) -> Resolution {
        if !self.has_synced() {
            return Resolution::Inconclusive;
        }
        let key = ObjectRef::<Workflow>::new(name).within(namespace);
        if self.store.get(&key).is_some() {
            Resolution::Present
        } else {
            Resolution::Absent
        }
    }
}

/// Used when the mirror is disabled: every parent goes to the API server.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl WorkflowCache for NoCache {
    fn has_synced(&self) -> bool {
        true
    }

    fn lookup(&self, _namespace: &str, _name: &str) -> Resolution {
        Resolution::Inconclusive
    }
}
