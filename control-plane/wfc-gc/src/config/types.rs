use std::time::Duration;

use envconfig::Envconfig;
use kube::api::DeleteParams;
use tracing::warn;

#[derive(Envconfig, Clone, Debug)]
pub struct GcConfig {
    #[envconfig(from = "HTTP_PORT", default = "8089")]
    pub http_port: u16,

    /// Seconds between two sweeps.
    /// Env: WFC_GC_INTERVAL_SECS
    #[envconfig(from = "WFC_GC_INTERVAL_SECS", default = "10")]
    pub interval_secs: u64,

    /// Consult the local Workflow mirror before reading the API server.
    /// When false every parent is resolved with a direct read.
    /// Env: WFC_GC_CACHE_ENABLED
    #[envconfig(from = "WFC_GC_CACHE_ENABLED", default = "true")]
    pub cache_enabled: bool,

    /// Restrict the collector to a single namespace (unset = all namespaces)
    /// Env: WFC_GC_NAMESPACE
    #[envconfig(from = "WFC_GC_NAMESPACE")]
    pub namespace: Option<String>,

    /// Env: WFC_GC_PROPAGATION_POLICY (background | foreground | orphan)
    #[envconfig(from = "WFC_GC_PROPAGATION_POLICY", default = "background")]
    pub propagation_policy: String,

    /// Upper bound on parent keys handled concurrently within one pass.
    /// Env: WFC_GC_MAX_CONCURRENCY
    #[envconfig(from = "WFC_GC_MAX_CONCURRENCY", default = "4")]
    pub max_concurrency: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            http_port: 8089,
            interval_secs: 10,
            cache_enabled: true,
            namespace: None,
            propagation_policy: PropagationPolicy::Background.to_string(),
            max_concurrency: 4,
        }
    }
}

impl GcConfig {
    /// Clamp numeric knobs and canonicalize the propagation policy.
    pub fn normalized(mut self) -> Self {
        if self.interval_secs == 0 {
            warn!("WFC_GC_INTERVAL_SECS=0 is not allowed; using 1");
            self.interval_secs = 1;
        }
        if self.max_concurrency == 0 {
            warn!("WFC_GC_MAX_CONCURRENCY=0 is not allowed; using 1");
            self.max_concurrency = 1;
        }
        self.namespace = self
            .namespace
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());
        let policy = PropagationPolicy::parse(&self.propagation_policy);
        self.propagation_policy = policy.to_string();
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn propagation(&self) -> PropagationPolicy {
        PropagationPolicy::parse(&self.propagation_policy)
    }
}

/// Cascade policy applied to the dependents (pods) of the deleted Jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationPolicy {
    Background,
    Foreground,
    Orphan,
}

impl PropagationPolicy {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => PropagationPolicy::Background,
            "foreground" => PropagationPolicy::Foreground,
            "orphan" => PropagationPolicy::Orphan,
            other => {
                warn!(policy = %other, "unknown propagation policy; using background");
                PropagationPolicy::Background
            }
        }
    }

    pub fn delete_params(self) -> DeleteParams {
        match self {
            PropagationPolicy::Background => DeleteParams::background(),
            PropagationPolicy::Foreground => DeleteParams::foreground(),
            PropagationPolicy::Orphan => DeleteParams::orphan(),
        }
    }
}

impl std::fmt::Display for PropagationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropagationPolicy::Background => write!(f, "background"),
            PropagationPolicy::Foreground => write!(f, "foreground"),
            PropagationPolicy::Orphan => write!(f, "orphan"),
        }
    }
}
