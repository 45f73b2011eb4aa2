//! Protocol-level failures of the MCP wire crates.
//!
//! Chart faults never show up here: they are rendered into tool results by the
//! charts crate. This enum only covers what can go wrong between the byte
//! stream and a router.

use std::{io, string::FromUtf8Error};

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("I/O error on the transport: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid URI: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// A well-formed message that breaks JSON-RPC rules.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),
}

impl Error {
    /// Faults caused by the peer's input rather than by this process.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Error::Io(_))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
