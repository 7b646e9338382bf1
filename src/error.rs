use thiserror::Error;
use crate::algorithms::AlgorithmKind;

/// Message shown to callers when a valuation fails for any reason other than
/// invalid input.
pub const GENERIC_FAILURE_MESSAGE: &str = "valuation failed, please retry";

#[derive(Error, Debug)]
pub enum Error {
    // Input Errors
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    // Algorithm Errors
    #[error("Algorithm already registered: {0}")]
    AlgorithmAlreadyRegistered(AlgorithmKind),

    #[error("Algorithm not registered: {0}")]
    AlgorithmNotRegistered(AlgorithmKind),

    #[error("Computation failed in {algorithm}: {reason}")]
    Computation {
        algorithm: AlgorithmKind,
        reason: String,
    },

    // Market Data Errors
    #[error("Source {source_id} fetch failed: {reason}")]
    SourceFetch {
        source_id: String,
        reason: String,
    },

    #[error("Source {source_id} timed out after {timeout_ms}ms")]
    SourceTimeout {
        source_id: String,
        timeout_ms: u64,
    },

    #[error("All {attempted} enabled market data sources failed")]
    AllSourcesFailed { attempted: usize },

    #[error("No enabled market data sources")]
    NoEnabledSources,

    #[error("Market data source not found: {0}")]
    SourceNotFound(String),

    // Outbound Errors
    #[error("Event publish failed: {0}")]
    EventPublish(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task failure: {0}")]
    TaskFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Messages safe to show an end user. Validation problems are listed in
    /// full; everything else collapses to a generic retry message.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            Error::Validation(errors) => errors.messages().to_vec(),
            _ => vec![GENERIC_FAILURE_MESSAGE.to_string()],
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// Every problem found in one set of valuation parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}
