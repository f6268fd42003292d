use std::fmt::Display;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the search client and its collaborators.
///
/// Pipeline code degrades most of these to "treat as empty" rather than
/// surfacing them to callers; they exist so collaborators have a typed
/// boundary and so logs carry the failure class.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("upstream provider returned status {0}")]
    UpstreamStatus(u16),
    #[error("search index error: {0}")]
    Index(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("text generation failed: {0}")]
    Generation(String),
    #[error("generation output failed validation: {0}")]
    MalformedOutput(String),
    #[error("invalid search option `{option}`: {value}")]
    InvalidOption { option: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    UpstreamStatus,
    Index,
    Store,
    Generation,
    MalformedOutput,
    InvalidOption,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::UpstreamStatus(_) => ErrorKind::UpstreamStatus,
            Error::Index(_) => ErrorKind::Index,
            Error::Store(_) => ErrorKind::Store,
            Error::Generation(_) => ErrorKind::Generation,
            Error::MalformedOutput(_) => ErrorKind::MalformedOutput,
            Error::InvalidOption { .. } => ErrorKind::InvalidOption,
        }
    }

    pub fn transport(err: impl Display) -> Self {
        Error::Transport(err.to_string())
    }
}

// surf errors are anyhow-style and do not implement std::error::Error,
// so carry them as their display form.
impl From<surf::Error> for Error {
    fn from(err: surf::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedOutput(err.to_string())
    }
}
