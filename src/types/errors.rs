use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Unhandled file type: \"{0}\"")]
    UnhandledFileType(String),

    #[error("Unable to update words in dictionary \"{dictionary}\", unsupported format: \"{path}\"")]
    UnsupportedDictionaryFormat { dictionary: String, path: PathBuf },

    #[error("Unable to update words {words:?} in dictionary \"{dictionary}\": {reason}")]
    DictionaryWrite {
        dictionary: String,
        words: Vec<String>,
        reason: String,
    },

    #[error("No matching configuration found.")]
    NoMatchingConfigTarget,

    #[error("Configuration targets are not ordered most-specific first")]
    TargetOrderViolation,

    #[error("Cannot find appropriate config repository for {0}")]
    NoRepositoryForTarget(String),

    #[error("`cspell` section missing from \"{0}\"")]
    MissingCSpellSection(PathBuf),

    #[error("Invalid file path: {0}")]
    InvalidPath(PathBuf),

    #[error("Server protocol error: {0}")]
    Protocol(String),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ClientError {
    /// True when the error represents a missing file or a missing `cspell`
    /// section, both of which read paths recover from with a default value.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            ClientError::MissingCSpellSection(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
