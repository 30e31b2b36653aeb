/// Error types shared by the archive client, the cache and the frame loader
///
/// Every variant falls in one of three families:
/// - transport: the archive could not be reached or refused the request
/// - parse: a file name or timestamp did not follow the archive convention
/// - local: filesystem, decoding and configuration problems
///
/// None of them is fatal for the slideshow. Call sites on the poll path
/// reduce them to a log line and carry on.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP request itself failed (DNS, TLS, timeout, reset...)
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The archive answered, but not with a success status
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The archive root, or a path joined onto it, is not a valid URL
    #[error("invalid archive URL `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A file name that does not follow `<YYYYMMDD>_<HHMMSS>_<res>_<channel>.jpg`
    #[error("malformed archive file name `{0}`")]
    FileName(String),

    /// A timestamp token that chrono could not parse
    #[error("unparsable timestamp `{value}`: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// No cached image is available to display
    #[error("the image cache at {0} is empty")]
    EmptyCache(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid settings file: {0}")]
    Settings(#[from] serde_json::Error),

    /// A blocking worker panicked or was cancelled
    #[error("background task failed: {0}")]
    Join(String),
}

impl Error {
    /// Wrap an I/O error together with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for failures talking to the remote archive
    #[cfg(test)]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::Status { .. })
    }

    /// True for malformed names and timestamps
    #[cfg(test)]
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::FileName(_) | Error::Timestamp { .. })
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Join(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
