//! Tonpool console library
//!
//! The interactive console for staking pool operators: a key registry, a
//! single-threaded session that correlates node client requests with their
//! replies, and the command surface built on top of it. The binary in
//! `main.rs` wires these pieces to stdin, stdout and TCP endpoints.

pub mod api;
pub mod commands;
pub mod config;
pub mod continuation;
pub mod correlator;
pub mod dispatch;
pub mod error;
pub mod event_loop;
pub mod keys;
pub mod logging;
pub mod node;
pub mod relay;
pub mod session;
pub mod terminal;

pub use error::{CliError, CliErrorHandler, CliResult};
pub use session::Session;
