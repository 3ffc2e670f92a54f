use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::batch::v1::Job;
use kube::ResourceExt;
use serde::Serialize;

use crate::labels::workflow_name_of;

/// Lookup key of a parent Workflow: Jobs never reference a Workflow in
/// another namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParentKey {
    pub namespace: String,
    pub name: String,
}

impl ParentKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The facets of a child Job the collector looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub namespace: Option<String>,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl ChildRef {
    pub fn from_job(job: &Job) -> Self {
        Self {
            namespace: job.namespace(),
            name: job.name_any(),
            labels: job.labels().clone(),
        }
    }

    /// `None` when the Job lacks a namespace or the workflow label.
    pub fn parent_key(&self) -> Option<ParentKey> {
        let ns = self.namespace.as_deref().filter(|ns| !ns.is_empty())?;
        let wf = workflow_name_of(&self.labels)?;
        Some(ParentKey::new(ns, wf))
    }
}

/// Answer of the mirror. `Absent` is a hint, `Inconclusive` means the
/// mirror cannot tell yet; neither licenses a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Present,
    Absent,
    Inconclusive,
}

/// Why an authoritative read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Throttled,
    Server,
    Forbidden,
    Transport,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Throttled => "throttled",
            ErrorKind::Server => "server",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Transport => "transport",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Where a parent key ended up in the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Unresolved,
    CacheConfirmedPresent,
    CacheConfirmedAbsent,
    CacheInconclusive,
    AuthoritativeConfirmedPresent,
    AuthoritativeConfirmedAbsent,
    AuthoritativeError,
}

impl ResolutionState {
    pub fn licenses_delete(self) -> bool {
        matches!(self, ResolutionState::AuthoritativeConfirmedAbsent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    NotAttempted,
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentOutcome {
    pub key: ParentKey,
    /// Jobs that referenced this parent when the pass listed them
    pub children: Vec<String>,
    pub state: ResolutionState,
    pub delete: DeleteOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub started_at: String,
    pub finished_at: String,
    pub children_seen: usize,
    pub malformed_children: Vec<String>,
    pub authoritative_lookups: usize,
    pub deletes_issued: usize,
    pub delete_failures: usize,
    pub parents: Vec<ParentOutcome>,
}

impl SweepReport {
    pub fn outcome(&self, key: &ParentKey) -> Option<&ParentOutcome> {
        self.parents.iter().find(|p| &p.key == key)
    }

    pub fn state_of(&self, key: &ParentKey) -> Option<ResolutionState> {
        self.outcome(key).map(|p| p.state)
    }

    pub fn orphaned_parents(&self) -> impl Iterator<Item = &ParentKey> {
        self.parents
            .iter()
            .filter(|p| p.state.licenses_delete())
            .map(|p| &p.key)
    }
}
