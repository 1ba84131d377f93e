//! Document chunking strategies for the miner
//!
//! A strategy turns a [`ChunkRequest`] into an ordered list of non-empty chunks.
//! Exactly one strategy is selected by name at startup (see [`registry`]).

pub mod error;
pub mod model_backed;
pub mod registry;
pub mod sentence_packing;
pub mod strategy;
pub mod types;

// Re-export main public interfaces
pub use error::{ChunkingError, Result};
pub use model_backed::{ModelBackedStrategy, RetryPolicy};
pub use registry::{DEFAULT_STRATEGY_NAME, STRATEGY_NAMES, create_strategy};
pub use sentence_packing::SentencePackingStrategy;
pub use strategy::ChunkStrategy;
pub use types::{ChunkRequest, ChunkResponse, ChunkResult};
