//! Error types shared by every container and pixel codec.

use std::io;
use thiserror::Error;

/// Builds an [`IconError::Format`] from `format!`-style arguments.
macro_rules! format_error {
    ($($arg:tt)+) => {
        $crate::error::IconError::Format(format!($($arg)+))
    };
}

/// Builds an [`IconError::Argument`] from `format!`-style arguments.
macro_rules! argument_error {
    ($($arg:tt)+) => {
        $crate::error::IconError::Argument(format!($($arg)+))
    };
}

/// Error raised while reading or writing an icon container.
#[derive(Debug, Error)]
pub enum IconError {
    /// The stream violates the structure of its format: bad magic, a length
    /// or offset mismatch, a CRC failure or a truncated chunk.
    #[error("format error: {0}")]
    Format(String),

    /// The caller asked for something that cannot be done: an unknown
    /// output kind, or a malformed selector clause.
    #[error("argument error: {0}")]
    Argument(String),

    /// The operating system refused an operation on the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IconError {
    /// Returns true if this is a structural format violation.
    pub fn is_format(&self) -> bool {
        matches!(self, IconError::Format(_))
    }

    /// Returns true if this error was caused by a bad caller argument.
    pub fn is_argument(&self) -> bool {
        matches!(self, IconError::Argument(_))
    }
}

/// Result type used throughout the crate.
pub type IconResult<T> = Result<T, IconError>;

/// Maps an I/O error raised while decoding a fixed-size structure held in
/// memory.  Running out of bytes there means the structure was truncated.
pub(crate) fn truncated(what: &'static str) -> impl FnOnce(io::Error) -> IconError {
    move |error| {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            format_error!("truncated {}", what)
        } else {
            IconError::Io(error)
        }
    }
}
