use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("Insufficient peers: {0}")]
    InsufficientPeers(String),

    #[error("No viable valuation: {0}")]
    NoViableValuation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Shorthand for fallible engine operations
pub type Result<T> = std::result::Result<T, ValuationError>;

/// Serializable failure tag, reported alongside successful results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingData,
    InvalidAssumptions,
    InsufficientPeers,
    NoViableValuation,
    NotFound,
}

impl ValuationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValuationError::MissingData(_) => ErrorKind::MissingData,
            ValuationError::InvalidAssumptions(_) => ErrorKind::InvalidAssumptions,
            ValuationError::InsufficientPeers(_) => ErrorKind::InsufficientPeers,
            ValuationError::NoViableValuation(_) => ErrorKind::NoViableValuation,
            ValuationError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}
