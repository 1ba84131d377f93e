//! Request and result records exchanged with the chunking engine

use super::error::{ChunkingError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Chunking request as delivered by the networking layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRequest {
    /// Document to split
    pub document: String,
    /// Maximum characters per chunk
    pub chunk_size: u32,
    /// Target (or maximum) number of chunks
    pub chunk_qty: u32,
    /// Advisory deadline of the caller, never enforced here
    #[serde(
        rename = "time_soft_max",
        alias = "soft_time_limit",
        default,
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub soft_time_limit: Duration,
}

impl ChunkRequest {
    pub fn new(document: impl Into<String>, chunk_size: u32, chunk_qty: u32) -> Self {
        Self {
            document: document.into(),
            chunk_size,
            chunk_qty,
            soft_time_limit: Duration::ZERO,
        }
    }

    pub fn with_soft_time_limit(mut self, limit: Duration) -> Self {
        self.soft_time_limit = limit;
        self
    }

    /// Check the request constraints (both sizes must be positive)
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::validation("chunk_size must be greater than 0"));
        }
        if self.chunk_qty == 0 {
            return Err(ChunkingError::validation("chunk_qty must be greater than 0"));
        }
        Ok(())
    }
}

/// Ordered, non-empty chunks produced by a strategy
///
/// `chunk_size` and `chunk_qty` are the effective values returned to the caller
/// (and signed), which equal the request's unless a strategy normalizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    chunks: Vec<String>,
    pub chunk_size: u32,
    pub chunk_qty: u32,
}

impl ChunkResult {
    /// Build a result for `request`, rejecting an empty list or any empty chunk
    pub fn new(request: &ChunkRequest, chunks: Vec<String>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(ChunkingError::validation("no chunks produced"));
        }
        if let Some(pos) = chunks.iter().position(|c| c.is_empty()) {
            return Err(ChunkingError::validation(format!(
                "chunk {pos} is empty"
            )));
        }
        Ok(Self {
            chunks,
            chunk_size: request.chunk_size,
            chunk_qty: request.chunk_qty,
        })
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_chunks(self) -> Vec<String> {
        self.chunks
    }
}

/// Signed response sent back to the requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub document: String,
    pub chunk_size: u32,
    pub chunk_qty: u32,
    #[serde(
        rename = "time_soft_max",
        alias = "soft_time_limit",
        default,
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub soft_time_limit: Duration,
    pub chunks: Vec<String>,
    /// Lowercase hex of the sr25519 signature
    pub miner_signature: String,
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn deserialize_secs<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    let secs = f64::deserialize(d)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
