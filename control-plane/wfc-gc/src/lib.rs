pub mod config;
pub mod crd;
pub mod gc;
pub mod labels;
pub mod runtime;
pub mod web;

use tracing_subscriber::{
    EnvFilter, filter::Directive, layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init_tracing(default_env: &str) {
    let mut filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy();
    if let Ok(directive) = default_env.parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}
