//! # ABCI Node
//!
//! Replays blocks read from stdin through the configured layer stack.
//!
//! ```text
//! $ printf 'a=1\nb=2\n---\na=1\n' | RUST_LOG=debug abci-node
//! ```

use std::io;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use abci_layers::RequestInfo;
use abci_node::{boot, LayerContainer, NodeConfig, Replayer};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env();
    info!(
        "[node] backend {:?}, data dir {}",
        config.backend,
        config.data_dir.display()
    );

    let container = LayerContainer::new(&config).context("assembling layer stack")?;
    let app = container.app();
    let status = boot(app, &config).context("starting application")?;

    let summary = Replayer::new(app, status.last_block_height + 1)
        .replay(io::stdin().lock())
        .context("replaying blocks")?;
    info!(
        "[node] replayed {} blocks: {} accepted, {} rejected",
        summary.blocks, summary.accepted, summary.rejected
    );

    let final_info = app.info(&RequestInfo::default()).context("querying info")?;
    info!(
        "[node] height {} app hash {}",
        final_info.last_block_height,
        hex::encode(&final_info.last_block_app_hash)
    );
    Ok(())
}
