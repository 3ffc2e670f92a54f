use std::sync::Arc;

use tracing::debug;

use crate::config::PropagationPolicy;
use crate::labels::children_of_selector;

use super::error::{GcError, is_not_found};
use super::store::JobStore;
use super::types::ParentKey;

/// Removes all Jobs of one workflow with a single collection delete.
pub struct BulkDeleter {
    store: Arc<dyn JobStore>,
    policy: PropagationPolicy,
}

impl BulkDeleter {
    pub fn new(store: Arc<dyn JobStore>, policy: PropagationPolicy) -> Self {
        Self { store, policy }
    }

    /// A 404 counts as success: the Jobs are already gone.
    pub async fn delete_all_of(&self, key: &ParentKey) -> Result<(), GcError> {
        let selector = children_of_selector(&key.name);
        debug!(workflow = %key, %selector, policy = %self.policy, "deleting job collection");
        match self
            .store
            .delete_collection(&key.namespace, &selector, self.policy)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(workflow = %key, "job collection already gone");
                Ok(())
            }
            Err(e) => Err(GcError::Delete {
                key: key.clone(),
                source: e,
            }),
        }
    }
}
