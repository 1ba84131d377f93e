//! Reads one chunking request (JSON) from stdin and writes the signed response to stdout.

use anyhow::{Context, Result};
use chunk_miner::util::tracing::{shutdown_tracer_provider, tracing_init_from_env};
use chunk_miner::{ChunkRequest, Miner, MinerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn run() -> Result<()> {
    let config = MinerConfig::from_env()?;
    tracing::debug!("miner config: {:?}", config);
    let miner = Miner::from_config(&config)
        .await
        .context("miner initialization failed")?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("cannot read request from stdin")?;
    let request: ChunkRequest =
        serde_json::from_str(&input).context("request is not a valid chunking request")?;

    let response = miner.forward(request).await?;
    let mut out = serde_json::to_vec(&response)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    MinerConfig::load_dotenv();
    tracing_init_from_env().await?;

    let result = run().await;
    if let Err(e) = &result {
        tracing::error!("chunk-miner failed: {:?}", e);
    }
    shutdown_tracer_provider();
    result
}
