use forge_numerics::ForgeError;
use semver::Version;
use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Error, EnumIs)]
pub enum DictError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    Toml {
        source: toml::de::Error,
        file: String,
    },

    #[error("Extension dictionary '{id}' is corrupt: {reason}")]
    CorruptDictionary { id: String, reason: String },

    #[error(
        "Extension dictionary '{id}' was written against base vocabulary {found}, which is incompatible with {expected}"
    )]
    IncompatibleBase {
        id: String,
        found: Version,
        expected: Version,
    },

    #[error(
        "Invalid dictionary id '{0}': ids use ASCII letters, digits, '_', '-' and '.', and may not start with '.'"
    )]
    InvalidDictionaryId(String),

    #[error("Invalid word {0:?}: nothing is left after normalization")]
    InvalidWord(String),

    #[error("Failed to acquire the lock of dictionary '{id}': {source}")]
    Lock {
        id: String,
        source: std::io::Error,
    },

    #[error("Malformed frame: {0}")]
    Format(#[from] ForgeError),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

pub type DictResult<T> = Result<T, DictError>;
