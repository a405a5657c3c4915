//! Error taxonomy shared by every devtag component.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type DevtagResult<T> = Result<T, DevtagError>;

#[derive(Debug, Error)]
pub enum DevtagError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed tag `{0}`")]
    InvalidTag(String),

    #[error("unsupported token {0}")]
    UnsupportedToken(String),

    #[error("cannot encode `{value}` as a path segment: {reason}")]
    Encoding { value: String, reason: String },

    #[error("expected link {0} does not exist")]
    LinkMissing(PathBuf),

    #[error("{0} is not a block device")]
    NotBlockDevice(PathBuf),

    #[error("cannot resolve {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{device} does not carry {token}")]
    VerificationMismatch { device: PathBuf, token: String },

    #[error("device cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("no device found for {token}={value}")]
    NotFound { token: String, value: String },

    #[error("failed to write uevent to {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
