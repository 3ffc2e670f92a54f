use std::sync::Arc;

use tracing::trace;

use super::error::{GcError, error_kind, is_not_found};
use super::store::WorkflowStore;
use super::types::ParentKey;

/// Point reads against the API server. Only a 404 means the workflow is gone.
pub struct AuthoritativeResolver {
    store: Arc<dyn WorkflowStore>,
}

impl AuthoritativeResolver {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// Whether the workflow exists. Any failure other than 404 is an error
    /// the caller must not read as absence.
    pub async fn resolve(&self, key: &ParentKey) -> Result<bool, GcError> {
        match self.store.get(&key.namespace, &key.name).await {
            Ok(_) => {
                trace!(workflow = %key, "authoritative: present");
                Ok(true)
            }
            Err(e) if is_not_found(&e) => {
                trace!(workflow = %key, "authoritative: not found");
                Ok(false)
            }
            Err(e) => Err(GcError::TransientResolve {
                key: key.clone(),
                kind: error_kind(&e),
                source: e,
            }),
        }
    }
}
