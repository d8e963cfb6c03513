use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Underlying failure carried by [`Error::Load`] and [`Error::Inference`].
#[derive(Debug)]
pub enum Cause {
    TokenizerError(tokenizers::Error),
    CandleError(candle_core::Error),
    SerializationError(serde_json::Error),
    IOError(std::io::Error),
    Invalid(String),
}

impl From<tokenizers::Error> for Cause {
    fn from(err: tokenizers::Error) -> Self {
        Self::TokenizerError(err)
    }
}

impl From<candle_core::Error> for Cause {
    fn from(err: candle_core::Error) -> Self {
        Self::CandleError(err)
    }
}

impl From<serde_json::Error> for Cause {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err)
    }
}

impl From<std::io::Error> for Cause {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err)
    }
}

impl Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::TokenizerError(e) => write!(f, "tokenizer error: {}", e),
            Self::CandleError(e) => write!(f, "candle error: {}", e),
            Self::SerializationError(e) => write!(f, "serialization error: {}", e),
            Self::IOError(e) => write!(f, "IO error: {}", e),
            Self::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            Self::TokenizerError(e) => Some(e.as_ref()),
            Self::CandleError(e) => Some(e),
            Self::SerializationError(e) => Some(e),
            Self::IOError(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

/// Failure kinds surfaced by configuration, loading and prediction.
#[derive(Debug)]
pub enum Error {
    /// An environment variable could not be coerced to its type.
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },
    /// A model or tokenizer file is absent at its configured path.
    ResourceNotFound { path: PathBuf },
    /// A file exists but could not be deserialized.
    Load { path: PathBuf, cause: Cause },
    /// Tokenization or the forward pass failed for a prediction call.
    Inference(Cause),
}

impl Error {
    pub(crate) fn load(path: &Path, cause: impl Into<Cause>) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    }

    pub(crate) fn inference(cause: impl Into<Cause>) -> Self {
        Self::Inference(cause.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::Config { key, value, reason } => {
                write!(f, "invalid value {:?} for {}: {}", value, key, reason)
            }
            Self::ResourceNotFound { path } => {
                write!(f, "resource not found: {}", path.display())
            }
            Self::Load { path, cause } => {
                write!(f, "failed to load {}: {}", path.display(), cause)
            }
            Self::Inference(cause) => write!(f, "inference error: {}", cause),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            Self::Load { cause, .. } | Self::Inference(cause) => Some(cause),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
