//! Command Dispatcher
//!
//! Splits an input line into a command word and its arguments and runs the
//! matching handler from the command table.

use tracing::debug;

use crate::commands::COMMANDS;
use crate::error::{CliError, CliResult};
use crate::session::{CommandToken, Flow, Session};

/// Signature shared by all command handlers.
///
/// `suffix` is the part of the command word after the table name; only
/// prefix commands such as `transfer` receive a non-empty one.
pub type Handler = fn(&mut Session, &CommandToken, &str, Args<'_>) -> CliResult<Flow>;

/// One entry of the command table
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    /// Match any command word starting with `name`
    pub prefix: bool,
    pub handler: Handler,
}

impl CommandSpec {
    fn matches<'w>(&self, word: &'w str) -> Option<&'w str> {
        if self.prefix {
            word.strip_prefix(self.name)
        } else if word == self.name {
            Some("")
        } else {
            None
        }
    }
}

/// Whitespace-separated reader over command arguments
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// Next word, or "" when exhausted
    pub fn word(&mut self) -> &'a str {
        let text = self.rest.trim_start();
        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        let (word, rest) = text.split_at(end);
        self.rest = rest;
        word
    }

    /// Everything left, without surrounding whitespace
    pub fn rest(&mut self) -> &'a str {
        let rest = self.rest.trim();
        self.rest = "";
        rest
    }

    pub fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }
}

/// Find the table entry for a command word
pub fn find_command(word: &str) -> Option<(&'static CommandSpec, &str)> {
    COMMANDS
        .iter()
        .find_map(|spec| spec.matches(word).map(|suffix| (spec, suffix)))
}

/// Run one command line and report its outcome through the session
pub fn dispatch(session: &mut Session, line: &str) {
    let mut args = Args::new(line);
    let word = args.word();
    if word.is_empty() {
        return;
    }

    let token = CommandToken::new(line.trim());
    let outcome = match find_command(word) {
        Some((spec, suffix)) => {
            debug!(command = spec.name, suffix, "dispatching");
            (spec.handler)(session, &token, suffix, args)
        }
        None => Err(CliError::UnknownCommand(word.to_string())),
    };
    session.settle(token, outcome);
}
