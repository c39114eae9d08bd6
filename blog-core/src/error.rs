use std::io;
use thiserror::Error;

use crate::object_id::ObjectId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate key: {0}")]
    DuplicateKey(ObjectId),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Cursor closed")]
    CursorClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::DuplicateKey(_) => "DUPLICATE_KEY",
            Error::Corruption(_) => "CORRUPTION",
            Error::CursorClosed => "CURSOR_CLOSED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Adds context to an error by wrapping it in an Internal error.
    ///
    /// # Examples
    ///
    /// ```
    /// use blog_core::Error;
    ///
    /// let err = Error::Corruption("bad byte".to_string()).with_context("loading snapshot");
    /// assert_eq!(err.to_string(), "Internal error: loading snapshot: Corruption detected: bad byte");
    /// ```
    pub fn with_context(self, context: &str) -> Error {
        Error::Internal(format!("{}: {}", context, self))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
