//! Strategy lookup by name

use super::error::{ChunkingError, Result};
use super::model_backed::ModelBackedStrategy;
use super::sentence_packing::SentencePackingStrategy;
use super::strategy::ChunkStrategy;
use crate::config::MinerConfig;
use itertools::Itertools;
use tracing::info;

pub const DEFAULT_STRATEGY_NAME: &str = SentencePackingStrategy::NAME;

pub const STRATEGY_NAMES: [&str; 2] = [SentencePackingStrategy::NAME, ModelBackedStrategy::NAME];

type StrategyFactory = fn(&MinerConfig) -> Box<dyn ChunkStrategy>;

fn sentence_packing(config: &MinerConfig) -> Box<dyn ChunkStrategy> {
    Box::new(SentencePackingStrategy::new(config.sentence_data_source()))
}

fn model_backed(config: &MinerConfig) -> Box<dyn ChunkStrategy> {
    Box::new(ModelBackedStrategy::new(config.openai.clone()))
}

fn factory(name: &str) -> Result<StrategyFactory> {
    let key = name.trim().to_ascii_lowercase();
    match key.as_str() {
        SentencePackingStrategy::NAME => Ok(sentence_packing),
        ModelBackedStrategy::NAME => Ok(model_backed),
        _ => Err(ChunkingError::configuration(format!(
            "unknown chunking strategy '{}' (available: {})",
            name,
            STRATEGY_NAMES.iter().join(", ")
        ))),
    }
}

/// Build the named strategy without initializing it.
///
/// `None` selects [`DEFAULT_STRATEGY_NAME`]. Names are matched case-insensitively.
pub fn build_strategy(name: Option<&str>, config: &MinerConfig) -> Result<Box<dyn ChunkStrategy>> {
    let build = factory(name.unwrap_or(DEFAULT_STRATEGY_NAME))?;
    Ok(build(config))
}

/// Build the named strategy and run its one-time initialization.
pub async fn create_strategy(
    name: Option<&str>,
    config: &MinerConfig,
) -> Result<Box<dyn ChunkStrategy>> {
    let mut strategy = build_strategy(name, config)?;
    strategy.initialize().await?;
    info!("chunking strategy '{}' initialized", strategy.name());
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::chunking::ChunkRequest;

    fn config_with_data_dir(dir: &std::path::Path) -> MinerConfig {
        MinerConfig {
            sentence_data_dir: Some(dir.to_string_lossy().to_string()),
            ..MinerConfig::default()
        }
    }

    #[test]
    fn test_lookup() {
        let config = MinerConfig::default();
        assert_eq!(build_strategy(None, &config).unwrap().name(), "punkt");
        assert_eq!(build_strategy(Some("punkt"), &config).unwrap().name(), "punkt");
        assert_eq!(build_strategy(Some(" OpenAI "), &config).unwrap().name(), "openai");
        for name in STRATEGY_NAMES {
            assert_eq!(build_strategy(Some(name), &config).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = build_strategy(Some("sliding"), &MinerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ChunkingError::Configuration(_)));
        let message = err.to_string();
        assert!(message.contains("sliding"));
        assert!(message.contains("punkt, openai"));
    }

    #[tokio::test]
    async fn test_create_initializes_sentence_packing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_data_dir(dir.path());
        let strategy = create_strategy(Some("punkt"), &config).await.unwrap();
        assert!(config.sentence_data_source().is_present());

        let result = strategy
            .process(&ChunkRequest::new("Hi. Bye.", 100, 1))
            .await
            .unwrap();
        assert_eq!(result.chunks(), ["Hi. Bye.".to_string()].as_slice());
    }

    #[tokio::test]
    async fn test_create_model_backed_without_key_fails() {
        let config = MinerConfig::default();
        let err = create_strategy(Some("openai"), &config).await.err().unwrap();
        assert!(matches!(err, ChunkingError::Configuration(_)));
    }
}
