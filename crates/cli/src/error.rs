use std::fmt;

use metablock_engine::MetaError;
use metablock_io::IoError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Validation(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure while loading inputs or running an experiment.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    Io(IoError),
    Meta(MetaError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Io(e) => write!(f, "{e}"),
            RunError::Meta(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Io(e) => Some(e),
            RunError::Meta(e) => Some(e),
        }
    }
}

impl From<IoError> for RunError {
    fn from(e: IoError) -> Self {
        RunError::Io(e)
    }
}

impl From<MetaError> for RunError {
    fn from(e: MetaError) -> Self {
        RunError::Meta(e)
    }
}
