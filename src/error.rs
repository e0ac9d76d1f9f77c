//! Unified error type.

use crate::http_error::HttpError;

/// The error type returned by drape's fallible operations.
///
/// Controllers return `Err(Error::Http(..))` to answer with an HTTP error;
/// the [`HttpErrors`](crate::middleware::HttpErrors) middleware turns those
/// into responses. Every other variant is an infrastructure failure and is
/// answered with `500` by [`Recover`](crate::middleware::Recover).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no such driver : {0}")]
    UnsupportedDriver(String),

    #[error("config: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an ad-hoc application failure.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// The HTTP error carried by this value, if any.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
