//! Errors raised while reading the job config and the platform description.
//!
//! All of them are fatal: the simulation never starts with an invalid cluster.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse platform description: {0}")]
    Platform(#[from] serde_yaml::Error),

    #[error("line {line}: expected `key value`, got {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: {key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { line: usize, key: String, value: String },

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid host range {0:?}, expected <prefix><N1>-<prefix><N2>")]
    InvalidHostRange(String),

    #[error("there must be exactly one master host, found {0}")]
    MasterCount(usize),

    #[error("no worker hosts declared")]
    NoWorkers,

    #[error("host {0} is declared more than once")]
    DuplicateHost(String),

    #[error("host {0} is declared in the config but missing from the platform")]
    UnknownHost(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
