use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;

use accord_chain::HttpChainClient;
use accord_node::{MediatorNode, NodeConfig};
use accord_oracle::HttpReasoningOracle;

#[derive(Parser)]
#[command(name = "accord", version, about = "ACCORD mediator node")]
struct Cli {
    /// Path to a TOML/JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = NodeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let chain = Arc::new(
        HttpChainClient::new(config.chain_url.clone(), timeout)
            .context("building chain client")?,
    );
    let oracle = Arc::new(
        HttpReasoningOracle::new(config.oracle_url.clone(), timeout)
            .context("building oracle client")?,
    );

    let node = Arc::new(MediatorNode::new(config, chain, oracle).context("starting node")?);
    info!("node {} online", node.node_id());

    let handles = node.start();
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown signal received");
    node.shutdown();
    for handle in handles {
        handle.await.ok();
    }
    info!("node stopped");
    Ok(())
}
