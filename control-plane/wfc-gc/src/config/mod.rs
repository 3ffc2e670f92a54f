mod types;

pub use types::{GcConfig, PropagationPolicy};
