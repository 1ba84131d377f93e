//! The miner's request handler: chunk with the configured strategy, then sign

use crate::config::MinerConfig;
use crate::signing::ResponseSigner;
use crate::text::chunking::{ChunkRequest, ChunkResponse, ChunkStrategy, Result, create_strategy};
use tracing::{debug, info, warn};

pub struct Miner {
    strategy: Box<dyn ChunkStrategy>,
    signer: ResponseSigner,
}

impl Miner {
    /// `strategy` must already be initialized.
    pub fn new(strategy: Box<dyn ChunkStrategy>, signer: ResponseSigner) -> Self {
        Self { strategy, signer }
    }

    /// Resolve the hotkey first, then select and initialize the configured strategy.
    pub async fn from_config(config: &MinerConfig) -> Result<Self> {
        let signer = ResponseSigner::new(config.hotkey()?);
        let strategy = create_strategy(Some(config.strategy_name()), config).await?;
        info!(
            "miner ready: strategy={} hotkey={}",
            strategy.name(),
            signer.hotkey().public_key_hex()
        );
        Ok(Self::new(strategy, signer))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn public_key_hex(&self) -> String {
        self.signer.hotkey().public_key_hex()
    }

    /// Chunk the request's document and return the signed response.
    ///
    /// Independent requests may be handled concurrently through a shared reference.
    pub async fn forward(&self, request: ChunkRequest) -> Result<ChunkResponse> {
        debug!(
            "Chunk size: {} Chunk qty: {} Time out: {:?}",
            request.chunk_size, request.chunk_qty, request.soft_time_limit
        );
        request.validate().inspect_err(|e| {
            warn!(category = e.category(), "rejected chunking request: {}", e);
        })?;
        let result = self.strategy.process(&request).await.inspect_err(|e| {
            warn!(
                strategy = self.strategy.name(),
                category = e.category(),
                "chunking failed: {}",
                e
            );
        })?;
        debug!("produced {} chunks", result.len());
        self.signer.sign_response(request, result)
    }
}
