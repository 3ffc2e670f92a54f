//! Collection of Jobs whose Workflow no longer exists.

pub mod cache;
pub mod dedup;
pub mod deleter;
pub mod error;
pub mod resolver;
pub mod store;
pub mod sweep;
pub mod types;

pub use cache::{NoCache, WorkflowCache, WorkflowMirror};
pub use dedup::DedupTracker;
pub use deleter::BulkDeleter;
pub use error::GcError;
pub use resolver::AuthoritativeResolver;
pub use store::{JobStore, KubeJobStore, KubeWorkflowStore, WorkflowStore};
pub use sweep::{GarbageCollector, LastReport};
pub use types::{
    ChildRef, DeleteOutcome, ErrorKind, ParentKey, ParentOutcome, Resolution,
    ResolutionState, SweepReport,
};
