// Contract Error Types
//
// Errors raised while building cells, decoding bags of cells or deriving
// contract states. Derivation failures are folded into a single coded
// shape so the console can display them uniformly.

use thiserror::Error;
use tonlib_core::cell::TonCellError;

/// Error code attached to every derivation failure.
pub const DERIVATION_ERROR_CODE: i32 = 400;

/// Errors produced by the contract envelope
#[derive(Error, Debug)]
pub enum ContractError {
    /// Role/index validation or state construction failed
    #[error("[{code}] {message}")]
    Derivation { code: i32, message: String },

    /// Cell construction or parsing failed
    #[error("Cell error: {0}")]
    Cell(#[from] TonCellError),

    /// Malformed bag-of-cells payload
    #[error("Invalid BOC: {0}")]
    InvalidBoc(String),

    /// Malformed public key identifier
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Malformed amount literal
    #[error("Failed to parse grams: {0}")]
    InvalidGrams(String),

    /// Template file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create a derivation error with the standard code
    pub fn derivation(message: impl Into<String>) -> Self {
        Self::Derivation {
            code: DERIVATION_ERROR_CODE,
            message: message.into(),
        }
    }

    /// Numeric code for display; 400 for derivation failures, 500 otherwise
    pub fn code(&self) -> i32 {
        match self {
            Self::Derivation { code, .. } => *code,
            _ => 500,
        }
    }
}

/// Convenient type alias for results in this crate
pub type Result<T> = std::result::Result<T, ContractError>;
