//! Error types for catalog loading and artwork resolution.

use thiserror::Error;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the loaders, the payload reader and the artwork
/// resolver.
///
/// A `Format` error on the envelope is fatal; on a trailing or optional
/// field the loaders log and continue with a partial record instead of
/// returning it.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid header, unknown version, unexpected object kind or an
    /// oversize declaration in the catalog stream.
    #[error("invalid catalog data: {0}")]
    Format(String),

    /// Failure of the underlying byte source.
    #[error("i/o error: {0}")]
    Io(std::io::Error),

    /// Cipher construction failed.
    #[error("cannot initialize payload cipher")]
    Crypto,

    /// The compressed payload section is not a valid zlib stream.
    #[error("corrupt compressed payload: {0}")]
    Compression(String),

    /// The artwork resolver found no image for the requested id.
    #[error("no artwork found for {0}")]
    NotFound(String),

    /// Artwork cache database failure.
    #[error("artwork database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The consumer cancelled the load.
    #[error("load cancelled")]
    Cancelled,
}

impl Error {
    /// Build a `Format` error from anything displayable.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        // The inflate layer reports corrupt streams as invalid-data reads.
        match e.kind() {
            ErrorKind::InvalidInput | ErrorKind::InvalidData => Error::Compression(e.to_string()),
            _ => Error::Io(e),
        }
    }
}
