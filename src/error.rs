//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout xgod.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// None of these are retried internally. A failed part write leaves whatever
/// was already written on disk; callers decide whether to clean it up.
#[derive(Debug)]
pub enum Error {
    /// None of the known XDVDFS layouts carried the volume magic.
    NotAnXboxImage,
    /// The stream ended before all expected bytes could be read.
    UnexpectedEof,
    /// The executable did not start with the `XEX2` signature.
    InvalidExecutableFormat,
    /// A directory lookup failed (the path that was requested).
    PathNotFound(String),
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// A header field was given a value that does not fit (field name).
    FieldOverflow(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotAnXboxImage => write!(f, "not an Xbox 360 disc image"),
            Error::UnexpectedEof => write!(f, "unexpected end of data"),
            Error::InvalidExecutableFormat => write!(f, "invalid executable format"),
            Error::PathNotFound(p) => write!(f, "path not found: {p}"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::FieldOverflow(s) => write!(f, "value does not fit header field: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}
