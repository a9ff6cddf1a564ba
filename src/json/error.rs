//! Error types for the JSON codec.

use std::fmt::Display;

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing or serialising JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input text is not well-formed JSON.
    #[error("Parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset where the error was detected.
        offset: usize,
        /// Description of what's wrong.
        message: String,
    },

    /// A value could not be converted into the dynamic value model.
    #[error("Serialisation error: {message}")]
    Serialize {
        /// Description of what's wrong.
        message: String,
    },
}

impl Error {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize {
            message: message.into(),
        }
    }

    /// Returns the byte offset of a parse error.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse { offset, .. } => Some(*offset),
            Self::Serialize { .. } => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Self::serialize(msg.to_string())
    }
}
