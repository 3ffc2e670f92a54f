use super::types::ParentKey;

/// Parent keys already taken care of in the current pass. One tracker per
/// pass; dropping it is how the pass forgets.
#[derive(Default)]
pub struct DedupTracker {
    handled: scc::HashSet<ParentKey>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_handled(&self, key: &ParentKey) -> bool {
        self.handled.contains(key)
    }

    pub fn mark_handled(&self, key: &ParentKey) {
        let _ = self.handled.insert(key.clone());
    }

    /// Atomically mark `key`; true only for the first caller.
    pub fn claim(&self, key: &ParentKey) -> bool {
        self.handled.insert(key.clone()).is_ok()
    }

    pub fn len(&self) -> usize {
        self.handled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }
}
