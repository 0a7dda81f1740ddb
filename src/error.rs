//! Contains [`Error`]

/// Errors generated by this crate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// When the compressed bytes are not a valid (or complete) gzip stream.
    Decompression(String),
    /// When a line is not valid utf8. Carries the one-based line number.
    Encoding {
        /// The one-based line number of the offending line
        line: usize,
        /// The underlying message
        message: String,
    },
    /// When the stream ends before the expected number of header lines were read.
    UnexpectedEndOfStream {
        /// The number of header lines requested
        expected: usize,
        /// The number of lines actually available
        found: usize,
    },
    /// When fetching the next chunk of the object failed.
    SourceUnavailable(String),
    /// When a [`ReadOptions`](crate::ReadOptions) value is not valid.
    InvalidConfiguration(String),
    /// When the trigger payload can't be interpreted.
    InvalidEvent(String),
    /// When the page sink rejected a page.
    Sink(String),
}

impl Error {
    /// Returns an [`Error::Decompression`].
    pub(crate) fn decompression<I: Into<String>>(message: I) -> Self {
        Self::Decompression(message.into())
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Decompression(message) => {
                write!(fmt, "Invalid gzip stream: {}", message)
            }
            Error::Encoding { line, message } => {
                write!(fmt, "Line {} is not valid utf8: {}", line, message)
            }
            Error::UnexpectedEndOfStream { expected, found } => {
                write!(
                    fmt,
                    "Stream ended after {} lines but {} header lines were expected",
                    found, expected
                )
            }
            Error::SourceUnavailable(message) => {
                write!(fmt, "Source unavailable: {}", message)
            }
            Error::InvalidConfiguration(message) => {
                write!(fmt, "Invalid configuration: {}", message)
            }
            Error::InvalidEvent(message) => {
                write!(fmt, "Invalid trigger event: {}", message)
            }
            Error::Sink(message) => {
                write!(fmt, "Sink failed: {}", message)
            }
        }
    }
}

impl From<flate2::DecompressError> for Error {
    fn from(e: flate2::DecompressError) -> Error {
        Error::Decompression(format!("underlying deflate error: {}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::SourceUnavailable(format!("underlying IO error: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::InvalidEvent(format!("underlying json error: {}", e))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Error {
        Error::InvalidConfiguration(format!("underlying integer error: {}", e))
    }
}

/// A specialized `Result` for this crate's errors.
pub type Result<T> = std::result::Result<T, Error>;
