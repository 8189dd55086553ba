use envconfig::Envconfig;
use kube::Client;
use mcp_operator::{config::OperatorConfig, crd_yaml, init_tracing, runtime};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    if std::env::args().skip(1).any(|a| a == "--generate-crds") {
        print!("{}", crd_yaml()?);
        return Ok(());
    }

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

    let cfg = OperatorConfig::init_from_env()?.normalized();
    info!(?cfg, "Starting MCP operator");

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
