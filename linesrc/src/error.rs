use std::io;

use thiserror::Error;

/// Failures raised while producing lines.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{location}: {source}")]
    Io {
        #[source]
        source: io::Error,
        location: String,
    },
    #[error("unsupported charset: {0}")]
    UnknownCharset(String),
}

impl SourceError {
    pub fn io(source: io::Error, location: impl Into<String>) -> Self {
        SourceError::Io {
            source,
            location: location.into(),
        }
    }
}
