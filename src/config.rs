//! Miner settings, read from `MINER_*` environment variables (and `.env`)

use crate::llm::OpenAiConfig;
use crate::signing::Hotkey;
use crate::text::chunking::{ChunkingError, DEFAULT_STRATEGY_NAME, Result};
use crate::text::sentence_data::SentenceDataSource;
use serde::Deserialize;

pub const DEFAULT_SENTENCE_DATA_DIR: &str = "./nltk_data";

#[derive(Deserialize, Clone, Default)]
pub struct MinerConfig {
    /// chunking strategy name, `punkt` when unset
    #[serde(default)]
    pub strategy_name: Option<String>,
    /// 32 byte mini secret key (hex)
    #[serde(default)]
    pub hotkey_seed: Option<String>,
    #[serde(default)]
    pub hotkey_public: Option<String>,
    /// 64 byte secret key (hex), requires `hotkey_public`
    #[serde(default)]
    pub hotkey_private: Option<String>,
    #[serde(default)]
    pub sentence_data_dir: Option<String>,
    #[serde(default)]
    pub sentence_data_url: Option<String>,
    #[serde(skip)]
    pub openai: OpenAiConfig,
}

impl std::fmt::Debug for MinerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("MinerConfig")
            .field("strategy_name", &self.strategy_name)
            .field("hotkey_seed", &redact(&self.hotkey_seed))
            .field("hotkey_public", &self.hotkey_public)
            .field("hotkey_private", &redact(&self.hotkey_private))
            .field("sentence_data_dir", &self.sentence_data_dir)
            .field("sentence_data_url", &self.sentence_data_url)
            .field("openai", &self.openai)
            .finish()
    }
}

impl MinerConfig {
    /// Load `.env` into the process environment if present
    pub fn load_dotenv() {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {:?}", path);
        }
    }

    pub fn from_env() -> Result<Self> {
        let mut config = envy::prefixed("MINER_")
            .from_env::<MinerConfig>()
            .map_err(|e| ChunkingError::configuration(format!("cannot read miner config: {e}")))?;
        config.openai = OpenAiConfig::from_env()
            .map_err(|e| ChunkingError::configuration(format!("cannot read openai config: {e}")))?;
        Ok(config)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STRATEGY_NAME)
    }

    /// The signing key pair. A seed wins over an explicit pair.
    pub fn hotkey(&self) -> Result<Hotkey> {
        match (
            self.hotkey_seed.as_deref(),
            self.hotkey_public.as_deref(),
            self.hotkey_private.as_deref(),
        ) {
            (Some(seed), _, _) => Hotkey::from_seed_hex(seed),
            (None, Some(public), Some(private)) => Hotkey::from_pair_hex(public, private),
            (None, Some(_), None) | (None, None, Some(_)) => Err(ChunkingError::configuration(
                "MINER_HOTKEY_PUBLIC and MINER_HOTKEY_PRIVATE must be set together",
            )),
            (None, None, None) => Err(ChunkingError::configuration(
                "no hotkey configured: set MINER_HOTKEY_SEED or MINER_HOTKEY_PUBLIC/MINER_HOTKEY_PRIVATE",
            )),
        }
    }

    pub fn sentence_data_source(&self) -> SentenceDataSource {
        let dir = self
            .sentence_data_dir
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SENTENCE_DATA_DIR);
        let url = self.sentence_data_url.clone().filter(|s| !s.is_empty());
        SentenceDataSource::new(dir, url)
    }
}
