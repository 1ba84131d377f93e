//! Sentence boundary data (abbreviation list) and its local cache
//!
//! The data lives under `<data dir>/tokenizers/punkt/english.abbrev`. When the
//! file is missing it is fetched once (downloaded from a configured URL, or the
//! bundled list is installed) before the splitter first needs it.

use super::chunking::error::{ChunkingError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Bundled English abbreviation list
pub const BUNDLED_ABBREVIATIONS: &str = include_str!("../../resources/english.abbrev");

/// Location of the abbreviation list relative to the data directory
pub const ABBREVIATIONS_PATH: &str = "tokenizers/punkt/english.abbrev";

/// Parsed sentence boundary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceData {
    abbreviations: HashSet<String>,
}

impl SentenceData {
    /// Parse one abbreviation per line; blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        let abbreviations = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.trim_end_matches('.').to_lowercase())
            .collect();
        Self { abbreviations }
    }

    pub fn bundled() -> Self {
        Self::parse(BUNDLED_ABBREVIATIONS)
    }

    pub fn abbreviations(&self) -> &HashSet<String> {
        &self.abbreviations
    }

    pub fn is_empty(&self) -> bool {
        self.abbreviations.is_empty()
    }
}

/// Local cache of the sentence data with a one-time fetch when absent
#[derive(Debug, Clone)]
pub struct SentenceDataSource {
    data_dir: PathBuf,
    download_url: Option<String>,
}

impl SentenceDataSource {
    pub fn new(data_dir: impl Into<PathBuf>, download_url: Option<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            download_url: download_url.filter(|u| !u.is_empty()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(ABBREVIATIONS_PATH)
    }

    pub fn is_present(&self) -> bool {
        self.path().is_file()
    }

    /// Make sure the data file exists locally, fetching it when missing.
    pub async fn ensure(&self) -> Result<PathBuf> {
        let path = self.path();
        if path.is_file() {
            tracing::debug!("sentence data found at {:?}", path);
            return Ok(path);
        }
        tracing::debug!("sentence data not found at {:?}. Downloading...", path);
        let content = self.fetch().await?;
        if SentenceData::parse(&content).is_empty() {
            return Err(ChunkingError::resource_fetch(
                "fetched sentence data contains no entries",
            ));
        }
        install(&path, &content).map_err(|e| {
            ChunkingError::resource_fetch(format!("cannot store sentence data to {path:?}: {e}"))
        })?;
        tracing::debug!("sentence data download completed.");
        Ok(path)
    }

    /// Read and parse the cached data file.
    pub fn load(&self) -> Result<SentenceData> {
        let path = self.path();
        let content = fs::read_to_string(&path).map_err(|e| {
            ChunkingError::resource_fetch(format!("cannot read sentence data {path:?}: {e}"))
        })?;
        Ok(SentenceData::parse(&content))
    }

    async fn fetch(&self) -> Result<String> {
        let Some(url) = self.download_url.as_deref() else {
            return Ok(BUNDLED_ABBREVIATIONS.to_string());
        };
        let response = reqwest::get(url).await.map_err(|e| {
            ChunkingError::resource_fetch(format!("download {url} failed: {e}"))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChunkingError::resource_fetch(format!(
                "download {url} returned status {status}"
            )));
        }
        response
            .text()
            .await
            .map_err(|e| ChunkingError::resource_fetch(format!("download {url} failed: {e}")))
    }
}

// temp file in the target directory + rename
fn install(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
