//! Label contract between the workflow controller and the Jobs it spawns.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use kube::api::ListParams;

/// Present on every Job created on behalf of a Workflow.
pub const MANAGED_BY_LABEL: &str = "dag.example.com/managed-by";
pub const MANAGED_BY_VALUE: &str = "workflow-controller";
/// Name of the owning Workflow (same namespace as the Job).
pub const WORKFLOW_LABEL: &str = "dag.example.com/workflow";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Requirement {
    Exists(String),
    Equals(String, String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Exists(k) => write!(f, "{}", k),
            Requirement::Equals(k, v) => write!(f, "{}={}", k, v),
        }
    }
}

/// Conjunction of label requirements, kept sorted so two selectors built
/// from the same inputs compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selector(BTreeSet<Requirement>);

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.0.insert(Requirement::Exists(key.into()));
        self
    }

    pub fn equals(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.0.insert(Requirement::Equals(key.into(), value.into()));
        self
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.0.iter()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|r| r.matches(labels))
    }

    pub fn to_list_params(&self) -> ListParams {
        ListParams::default().labels(&self.to_string())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for r in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

/// Every Job produced by the workflow controller, whatever its workflow.
pub fn managed_children_selector() -> Selector {
    Selector::new().exists(MANAGED_BY_LABEL)
}

/// Jobs produced for one workflow. Namespace scoping is up to the caller.
pub fn children_of_selector(workflow: &str) -> Selector {
    managed_children_selector().equals(WORKFLOW_LABEL, workflow)
}

/// Labels stamped on a Job created for `workflow`.
pub fn child_labels(workflow: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
        (WORKFLOW_LABEL.to_string(), workflow.to_string()),
    ])
}

/// Owning workflow name read from a Job's labels, if any.
pub fn workflow_name_of(labels: &BTreeMap<String, String>) -> Option<&str> {
    labels
        .get(WORKFLOW_LABEL)
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}
