use thiserror::Error;

use crate::mutation::error_codes;
use crate::query::QueryKey;

/// The request never produced a server verdict.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    /// The whole request was refused before any item was processed.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl TransportError {
    /// Code reported for every target of a mutation that failed this way.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_codes::TIMEOUT,
            Self::Connection(_) | Self::Rejected { .. } => error_codes::TRANSPORT_ERROR,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("query not found: {0}")]
    NotFound(QueryKey),

    #[error("failed to decode page: {0}")]
    Decode(String),
}
