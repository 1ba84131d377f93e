//! Error types for document chunking

use crate::llm::LlmError;

/// Error types for chunking, strategy setup and response signing
#[derive(thiserror::Error, Debug)]
pub enum ChunkingError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sentence data unavailable: {0}")]
    ResourceFetch(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gave up after {attempts} attempts: {source}")]
    Terminal {
        attempts: u32,
        #[source]
        source: Box<ChunkingError>,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for chunk-miner operations
pub type Result<T> = std::result::Result<T, ChunkingError>;

impl From<LlmError> for ChunkingError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::NotConfigured(_) => Self::Configuration(e.to_string()),
            LlmError::Http(_)
            | LlmError::Api { .. }
            | LlmError::Unauthorized { .. }
            | LlmError::Parse(_) => Self::Transport(e.to_string()),
        }
    }
}

impl ChunkingError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a resource fetch error
    pub fn resource_fetch<S: Into<String>>(msg: S) -> Self {
        Self::ResourceFetch(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a signing error
    pub fn signing<S: Into<String>>(msg: S) -> Self {
        Self::Signing(msg.into())
    }

    /// Wrap the last failure of an exhausted retry loop
    pub fn terminal(attempts: u32, last: ChunkingError) -> Self {
        Self::Terminal {
            attempts,
            source: Box::new(last),
        }
    }

    /// Whether a retry of the same request may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            // bad model output or a flaky service
            Self::Validation(_) | Self::Transport(_) => true,
            Self::Configuration(_) | Self::ResourceFetch(_) | Self::Signing(_) => false,
            Self::Terminal { .. } => false,
            Self::Io(_) | Self::Serialization(_) => false,
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ResourceFetch(_) => "resource_fetch",
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Terminal { .. } => "terminal",
            Self::Signing(_) => "signing",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
