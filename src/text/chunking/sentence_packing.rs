//! Rule-based strategy: greedy packing of whole sentences

use super::error::{ChunkingError, Result};
use super::strategy::ChunkStrategy;
use super::types::{ChunkRequest, ChunkResult};
use crate::text::SentenceSplitter;
use crate::text::sentence_data::SentenceDataSource;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::debug;

/// Packs consecutive sentences into chunks of at most `chunk_size` characters.
///
/// Sentences are never split, so a sentence longer than `chunk_size` becomes a
/// chunk of its own. `chunk_qty` is ignored.
pub struct SentencePackingStrategy {
    source: SentenceDataSource,
    // loaded on first use, then shared read-only
    splitter: OnceCell<SentenceSplitter>,
}

impl SentencePackingStrategy {
    pub const NAME: &'static str = "punkt";

    pub fn new(source: SentenceDataSource) -> Self {
        Self {
            source,
            splitter: OnceCell::new(),
        }
    }

    fn splitter(&self) -> Result<&SentenceSplitter> {
        self.splitter.get_or_try_init(|| {
            let data = self.source.load()?;
            debug!(
                "loaded {} abbreviations for sentence splitting",
                data.abbreviations().len()
            );
            Ok(SentenceSplitter::new(&data))
        })
    }
}

/// Greedily join sentences with a single space while the chunk stays within
/// `chunk_size` characters.
pub fn pack_sentences<I>(sentences: I, chunk_size: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut chunks: Vec<String> = Vec::new();
    let mut current_len = 0;

    for sentence in sentences {
        let len = sentence.chars().count();
        match chunks.last_mut() {
            Some(last) if current_len + 1 + len <= chunk_size => {
                last.push(' ');
                last.push_str(&sentence);
                current_len += 1 + len;
            }
            _ => {
                chunks.push(sentence);
                current_len = len;
            }
        }
    }
    chunks
}

#[async_trait]
impl ChunkStrategy for SentencePackingStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn initialize(&mut self) -> Result<()> {
        self.source.ensure().await?;
        Ok(())
    }

    async fn process(&self, request: &ChunkRequest) -> Result<ChunkResult> {
        request.validate()?;
        let sentences = self.splitter()?.split(&request.document);
        if sentences.is_empty() {
            return Err(ChunkingError::validation("document contains no sentences"));
        }
        let sentence_count = sentences.len();
        let chunks = pack_sentences(sentences, request.chunk_size as usize);
        debug!(
            "Packed {} sentences into {} chunks (chunk_size: {})",
            sentence_count,
            chunks.len(),
            request.chunk_size
        );
        ChunkResult::new(request, chunks)
    }
}
