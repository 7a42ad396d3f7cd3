//! Error kinds surfaced at the reader/writer boundary.
//!
//! A plain enum with a hand-written `Display`/`Error` impl and a
//! `From<std::io::Error>` so `?` composes through I/O.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Malformed input bytes: bad magic, truncated structure, tag out of range.
    /// Surfaced at the reader boundary; never retried.
    Format { message: String },
    /// The constant pool would exceed 65535 entries.
    ClassTooLarge,
    /// An emitted method's `code` attribute would exceed 65535 bytes.
    MethodTooLarge {
        class: String,
        method: String,
        descriptor: String,
        length: usize,
    },
    /// A node was asked to visit a feature unavailable at the configured class-file version.
    UnsupportedVersion {
        feature: &'static str,
        required_major: u16,
        actual_major: u16,
    },
    /// Internal invariant broken by caller misuse (e.g. an unresolved label at `to_bytes`).
    InvariantViolation { message: String },
    /// The modified-UTF-8 encoding of a single string exceeds 65535 bytes.
    UtfTooLong { length: usize },
    /// Propagated I/O failure (only relevant to consumers feeding a `Read`/`Write`).
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format { message } => write!(f, "malformed class file: {message}"),
            Error::ClassTooLarge => {
                write!(f, "constant pool would exceed 65535 entries")
            }
            Error::MethodTooLarge {
                class,
                method,
                descriptor,
                length,
            } => write!(
                f,
                "method {class}.{method}{descriptor} is too large: {length} bytes of code (max 65535)"
            ),
            Error::UnsupportedVersion {
                feature,
                required_major,
                actual_major,
            } => write!(
                f,
                "{feature} requires class file major version >= {required_major}, got {actual_major}"
            ),
            Error::InvariantViolation { message } => write!(f, "internal invariant violated: {message}"),
            Error::UtfTooLong { length } => write!(
                f,
                "modified UTF-8 encoding is {length} bytes, which exceeds the 65535 byte limit"
            ),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Format {
            message: message.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Error::InvariantViolation {
            message: message.into(),
        }
    }
}
