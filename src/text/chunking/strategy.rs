use super::error::Result;
use super::types::{ChunkRequest, ChunkResult};
use async_trait::async_trait;

/// A document chunking strategy.
///
/// `initialize` runs exactly once, before the strategy is shared. `process`
/// takes `&self` and may run concurrently for independent requests, so any
/// state it needs must be set up by `initialize` (or be a lazily filled,
/// write-once cell).
#[async_trait]
pub trait ChunkStrategy: Send + Sync {
    /// Registry name of this strategy
    fn name(&self) -> &'static str;

    /// One-time setup (fetch resources, build clients)
    async fn initialize(&mut self) -> Result<()>;

    /// Split the request's document into chunks
    async fn process(&self, request: &ChunkRequest) -> Result<ChunkResult>;
}
