pub mod config;
pub mod llm;
pub mod miner;
pub mod signing;
pub mod text;
pub mod util;

pub use config::MinerConfig;
pub use miner::Miner;
pub use text::chunking::{ChunkRequest, ChunkResponse, ChunkingError};
