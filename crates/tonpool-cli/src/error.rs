//! CLI Error Handling
//!
//! Errors local to a command's completion chain are `CliError`s and end up
//! printed as `Query {<line>} FAILED`. Start-up failures travel as
//! `anyhow::Error` to the binary edge, where `CliErrorHandler` reports them.

//-----------------------------------------------------------------------------
// Command Errors
//-----------------------------------------------------------------------------

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::prelude::*;
use serde_json::{json, Value};
use thiserror::Error;
use tonpool_contracts::ContractError;

/// Key lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Ambiguous(String),
}

/// Error reported by the node client or the relay transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct RemoteError {
    pub code: i32,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors produced while handling console commands
#[derive(Error, Debug)]
pub enum CliError {
    /// Malformed command arguments
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Unrecoverable state, e.g. a corrupt key store at start-up
    #[error("Fatal error: {0}")]
    Fatal(String),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The node client answered with an object of the wrong type
    #[error("Unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply { expected: &'static str, got: String },

    #[error("Unknown query `{0}`")]
    UnknownCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for command handling
pub type CliResult<T> = std::result::Result<T, CliError>;

//-----------------------------------------------------------------------------
// Start-up Error Reporting
//-----------------------------------------------------------------------------

/// Reports errors that abort the process
#[derive(Clone)]
pub struct CliErrorHandler {
    pub verbose: bool,
    pub json: bool,
}

impl CliErrorHandler {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn handle_error(&self, error: &anyhow::Error) -> Value {
        let error_message = error.to_string();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let causes: Vec<String> = error.chain().skip(1).map(|c| c.to_string()).collect();
        let error_obj = json!({
            "error": error_message,
            "causes": causes,
            "timestamp": now,
            "timestamp_human": Local::now().to_rfc3339(),
        });

        if self.json {
            eprintln!("{}", error_obj);
        } else {
            eprintln!("Error: {}", error_message);
            if self.verbose {
                for cause in &causes {
                    eprintln!("Caused by: {}", cause);
                }
            }
        }

        error_obj
    }
}
