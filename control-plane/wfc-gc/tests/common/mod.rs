#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use kube::core::ErrorResponse;
use wfc_gc::config::PropagationPolicy;
use wfc_gc::crd::workflow::{Workflow, WorkflowSpec};
use wfc_gc::gc::{
    ChildRef, JobStore, ParentKey, Resolution, WorkflowCache, WorkflowStore,
};
use wfc_gc::labels::{Selector, child_labels};

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn api_error(code: u16) -> kube::Error {
    let reason = match code {
        404 => "NotFound",
        429 => "TooManyRequests",
        500 => "InternalError",
        503 => "ServiceUnavailable",
        _ => "Unknown",
    };
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("fake {reason}"),
        reason: reason.into(),
        code,
    })
}

pub fn key(ns: &str, name: &str) -> ParentKey {
    ParentKey::new(ns, name)
}

/// A Job created for `workflow`, or an unlabelled managed Job when `None`.
pub fn job(ns: &str, name: &str, workflow: Option<&str>) -> ChildRef {
    let labels = match workflow {
        Some(wf) => child_labels(wf),
        None => {
            let mut l = child_labels("x");
            l.remove(wfc_gc::labels::WORKFLOW_LABEL);
            l
        }
    };
    ChildRef {
        namespace: Some(ns.to_string()),
        name: name.to_string(),
        labels,
    }
}

/// A Job that has nothing to do with the workflow controller.
pub fn foreign_job(ns: &str, name: &str) -> ChildRef {
    ChildRef {
        namespace: Some(ns.to_string()),
        name: name.to_string(),
        labels: BTreeMap::from([("app".to_string(), name.to_string())]),
    }
}

#[derive(Debug, Clone)]
pub struct DeleteCall {
    pub namespace: String,
    pub selector: String,
    pub policy: PropagationPolicy,
}

#[derive(Default)]
pub struct FakeJobStore {
    jobs: Mutex<Vec<ChildRef>>,
    list_error: Mutex<Option<u16>>,
    delete_errors: Mutex<HashMap<ParentKey, u16>>,
    list_calls: Mutex<Vec<Option<String>>>,
    delete_calls: Mutex<Vec<DeleteCall>>,
}

impl FakeJobStore {
    pub fn with_jobs(jobs: Vec<ChildRef>) -> Self {
        let s = Self::default();
        *s.jobs.lock().unwrap() = jobs;
        s
    }

    pub fn fail_list(&self, code: Option<u16>) {
        *self.list_error.lock().unwrap() = code;
    }

    pub fn fail_delete(&self, key: ParentKey, code: u16) {
        self.delete_errors.lock().unwrap().insert(key, code);
    }

    pub fn heal_delete(&self, key: &ParentKey) {
        self.delete_errors.lock().unwrap().remove(key);
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .map(|j| {
                format!("{}/{}", j.namespace.clone().unwrap_or_default(), j.name)
            })
            .collect();
        names.sort();
        names
    }

    pub fn delete_calls(&self) -> Vec<DeleteCall> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }
}

fn workflow_of(selector: &Selector) -> Option<String> {
    selector.requirements().find_map(|r| match r {
        wfc_gc::labels::Requirement::Equals(k, v)
            if k == wfc_gc::labels::WORKFLOW_LABEL =>
        {
            Some(v.clone())
        }
        _ => None,
    })
}

#[async_trait]
impl JobStore for FakeJobStore {
    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<ChildRef>, kube::Error> {
        self.list_calls
            .lock()
            .unwrap()
            .push(namespace.map(str::to_string));
        if let Some(code) = *self.list_error.lock().unwrap() {
            return Err(api_error(code));
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| {
                namespace.is_none_or(|ns| j.namespace.as_deref() == Some(ns))
            })
            .filter(|j| selector.matches(&j.labels))
            .cloned()
            .collect())
    }

    async fn delete_collection(
        &self,
        namespace: &str,
        selector: &Selector,
        policy: PropagationPolicy,
    ) -> Result<(), kube::Error> {
        self.delete_calls.lock().unwrap().push(DeleteCall {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            policy,
        });
        if let Some(wf) = workflow_of(selector) {
            if let Some(code) =
                self.delete_errors.lock().unwrap().get(&key(namespace, &wf))
            {
                return Err(api_error(*code));
            }
        }
        self.jobs.lock().unwrap().retain(|j| {
            !(j.namespace.as_deref() == Some(namespace)
                && selector.matches(&j.labels))
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeWorkflowStore {
    present: Mutex<HashSet<ParentKey>>,
    errors: Mutex<HashMap<ParentKey, u16>>,
    calls: Mutex<Vec<ParentKey>>,
}

impl FakeWorkflowStore {
    pub fn with(present: &[ParentKey]) -> Self {
        let s = Self::default();
        s.present.lock().unwrap().extend(present.iter().cloned());
        s
    }

    pub fn fail(&self, key: ParentKey, code: u16) {
        self.errors.lock().unwrap().insert(key, code);
    }

    pub fn heal(&self, key: &ParentKey) {
        self.errors.lock().unwrap().remove(key);
    }

    pub fn calls(&self) -> Vec<ParentKey> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &ParentKey) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| *k == key).count()
    }
}

pub fn workflow(ns: &str, name: &str) -> Workflow {
    let mut wf = Workflow::new(
        name,
        WorkflowSpec {
            active_deadline_seconds: None,
            steps: vec![],
            selector: None,
        },
    );
    wf.metadata.namespace = Some(ns.to_string());
    wf
}

#[async_trait]
impl WorkflowStore for FakeWorkflowStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Workflow, kube::Error> {
        let k = key(namespace, name);
        self.calls.lock().unwrap().push(k.clone());
        if let Some(code) = self.errors.lock().unwrap().get(&k) {
            return Err(api_error(*code));
        }
        if self.present.lock().unwrap().contains(&k) {
            Ok(workflow(namespace, name))
        } else {
            Err(api_error(404))
        }
    }
}

/// Mirror stand-in with a switchable sync flag.
#[derive(Default)]
pub struct FakeCache {
    synced: AtomicBool,
    present: Mutex<HashSet<ParentKey>>,
    lookups: Mutex<Vec<ParentKey>>,
}

impl FakeCache {
    pub fn synced(present: &[ParentKey]) -> Self {
        let c = Self::default();
        c.synced.store(true, Ordering::SeqCst);
        c.present.lock().unwrap().extend(present.iter().cloned());
        c
    }

    pub fn unsynced() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

impl WorkflowCache for FakeCache {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn lookup(&self, namespace: &str, name: &str) -> Resolution {
        let k = key(namespace, name);
        self.lookups.lock().unwrap().push(k.clone());
        if !self.has_synced() {
            return Resolution::Inconclusive;
        }
        if self.present.lock().unwrap().contains(&k) {
            Resolution::Present
        } else {
            Resolution::Absent
        }
    }
}
