use envconfig::Envconfig;
use kube::Client;
use tracing::info;
use wfc_gc::{config::GcConfig, init_tracing, runtime};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    // Ensure rustls uses the aws-lc-rs provider explicitly.
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    let cfg = GcConfig::init_from_env()?.normalized();
    info!(?cfg, "Starting workflow garbage collector");

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
