use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::{Api, Client};
use tracing::trace;

use crate::config::PropagationPolicy;
use crate::crd::workflow::Workflow;
use crate::labels::Selector;

use super::types::ChildRef;

/// Source of truth for the child Jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// List Jobs matching `selector`, in `namespace` or cluster-wide.
    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<ChildRef>, kube::Error>;

    /// Delete every Job of `namespace` matching `selector` in one call.
    async fn delete_collection(
        &self,
        namespace: &str,
        selector: &Selector,
        policy: PropagationPolicy,
    ) -> Result<(), kube::Error>;
}

/// Source of truth for the parent Workflows.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Workflow, kube::Error>;
}

#[derive(Clone)]
pub struct KubeJobStore {
    client: Client,
}

impl KubeJobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: Option<&str>) -> Api<Job> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl JobStore for KubeJobStore {
    async fn list(
        &self,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<ChildRef>, kube::Error> {
        let list = self
            .api(namespace)
            .list(&selector.to_list_params())
            .await?;
        trace!(count = list.items.len(), %selector, "listed jobs");
        Ok(list.items.iter().map(ChildRef::from_job).collect())
    }

    async fn delete_collection(
        &self,
        namespace: &str,
        selector: &Selector,
        policy: PropagationPolicy,
    ) -> Result<(), kube::Error> {
        let _ = self
            .api(Some(namespace))
            .delete_collection(
                &policy.delete_params(),
                &selector.to_list_params(),
            )
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct KubeWorkflowStore {
    client: Client,
}

impl KubeWorkflowStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkflowStore for KubeWorkflowStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Workflow, kube::Error> {
        let api: Api<Workflow> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }
}
