//! Console commands
//!
//! Each handler reads its arguments, then either finishes at once, submits
//! a request and continues in its completion, or suspends for more input.

pub mod account;
pub mod keys;
pub mod node;
pub mod pool;
pub mod stack;

use ed25519_dalek::SigningKey;
use zeroize::Zeroizing;

use tonpool_contracts::wallet::public_key_of;
use tonpool_contracts::{PublicKey, Role};

use crate::api::{ExportedUnencryptedKey, InputKey, Key, Request, SecureBytes};
use crate::dispatch::{Args, CommandSpec};
use crate::error::{CliError, CliResult};
use crate::keys::KeyRecord;
use crate::session::{CommandToken, Flow, Session};

/// Prompt shown before every password read
pub const PASSWORD_PROMPT: &str = "Enter password (could be empty)";

/// Prompt shown when a command needs a key and none was given
pub const CHOOSE_KEY_PROMPT: &str = "Choose public key (hex prefix or #N)";

//-----------------------------------------------------------------------------
// Command Table
//-----------------------------------------------------------------------------

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        usage: "help",
        description: "This help",
        prefix: false,
        handler: help,
    },
    CommandSpec {
        name: "time",
        usage: "time",
        description: "Get server time",
        prefix: false,
        handler: node::time,
    },
    CommandSpec {
        name: "remote-version",
        usage: "remote-version",
        description: "Shows server time, version and capabilities",
        prefix: false,
        handler: node::remote_version,
    },
    CommandSpec {
        name: "sendfile",
        usage: "sendfile <filename>",
        description: "Load a serialized message from <filename> and send it to server",
        prefix: false,
        handler: node::sendfile,
    },
    CommandSpec {
        name: "setconfig",
        usage: "setconfig <path> [<name>] [<use_callback>] [<force>]",
        description: "Set lite server config",
        prefix: false,
        handler: node::setconfig,
    },
    CommandSpec {
        name: "validateconfig",
        usage: "validateconfig <path> [<name>] [<use_callback>] [<force>]",
        description: "Validate lite server config",
        prefix: false,
        handler: node::validateconfig,
    },
    CommandSpec {
        name: "saveaccount",
        usage: "saveaccount <filename> <addr>",
        description: "Save the most recent StateInit of an account",
        prefix: false,
        handler: node::saveaccount,
    },
    CommandSpec {
        name: "saveaccountcode",
        usage: "saveaccountcode <filename> <addr>",
        description: "Save the most recent code of an account",
        prefix: false,
        handler: node::saveaccountcode,
    },
    CommandSpec {
        name: "saveaccountdata",
        usage: "saveaccountdata <filename> <addr>",
        description: "Save the most recent data of an account",
        prefix: false,
        handler: node::saveaccountdata,
    },
    CommandSpec {
        name: "runmethod",
        usage: "runmethod <addr> <method> <params>...",
        description: "Run a get-method of a smart contract",
        prefix: false,
        handler: node::runmethod,
    },
    CommandSpec {
        name: "sync",
        usage: "sync",
        description: "Synchronize with the blockchain",
        prefix: false,
        handler: node::sync,
    },
    CommandSpec {
        name: "netstats",
        usage: "netstats",
        description: "Show bytes relayed for the node client",
        prefix: false,
        handler: node::netstats,
    },
    CommandSpec {
        name: "genkey",
        usage: "genkey",
        description: "Generate new secret key",
        prefix: false,
        handler: keys::genkey,
    },
    CommandSpec {
        name: "keys",
        usage: "keys",
        description: "Show all stored keys",
        prefix: false,
        handler: keys::list,
    },
    CommandSpec {
        name: "importkey",
        usage: "importkey [<words>...]",
        description: "Import key from mnemonic words",
        prefix: false,
        handler: keys::importkey,
    },
    CommandSpec {
        name: "deletekeys",
        usage: "deletekeys",
        description: "Delete ALL PRIVATE KEYS",
        prefix: false,
        handler: keys::deletekeys,
    },
    CommandSpec {
        name: "deletekey",
        usage: "deletekey <key_id>",
        description: "Disabled, use deletekeys",
        prefix: false,
        handler: keys::deletekey,
    },
    CommandSpec {
        name: "exportkey",
        usage: "exportkey [<key_id>]",
        description: "Export key as mnemonic words",
        prefix: false,
        handler: keys::exportkey,
    },
    CommandSpec {
        name: "exportkeypem",
        usage: "exportkeypem [<key_id>]",
        description: "Export key as encrypted PEM",
        prefix: false,
        handler: keys::exportkeypem,
    },
    CommandSpec {
        name: "hint",
        usage: "hint <prefix>",
        description: "Show mnemonic words starting with <prefix>",
        prefix: false,
        handler: keys::hint,
    },
    CommandSpec {
        name: "address",
        usage: "address <key_id> <smc-type> [<wallet-id>]",
        description: "Show the address of a wallet, owner, pool or nominator contract",
        prefix: false,
        handler: account::address,
    },
    CommandSpec {
        name: "init",
        usage: "init <key_id> <smc-type> [<wallet-id>]",
        description: "Send the initialization message of a contract",
        prefix: false,
        handler: account::init,
    },
    CommandSpec {
        name: "getstate",
        usage: "getstate <key_id|address>",
        description: "Get state of an account",
        prefix: false,
        handler: account::getstate,
    },
    CommandSpec {
        name: "transfer",
        usage: "transfer[Ffekc] <from_key_id> <to_key_id|address> <amount> <message>",
        description: "Transfer <amount> of grams (F: messages from file, f: allow uninited, e: encrypt, k: fake key, c: estimate fees)",
        prefix: true,
        handler: account::transfer,
    },
    CommandSpec {
        name: "unpackaddress",
        usage: "unpackaddress <address>",
        description: "Validate and parse address",
        prefix: false,
        handler: account::unpackaddress,
    },
    CommandSpec {
        name: "setbounceable",
        usage: "setbounceable <address> [<bounceable>]",
        description: "Change bounceable flag in address",
        prefix: false,
        handler: account::setbounceable,
    },
    CommandSpec {
        name: "pool",
        usage: "pool <key_id> sns [<nominator>] [<status>]",
        description: "Send a set-nominator-status request from the owner wallet",
        prefix: false,
        handler: pool::pool,
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        description: "Exit",
        prefix: false,
        handler: exit,
    },
    CommandSpec {
        name: "quit",
        usage: "quit",
        description: "Exit",
        prefix: false,
        handler: exit,
    },
];

fn help(session: &mut Session, _token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    let mut text = String::new();
    for spec in COMMANDS {
        text.push_str(spec.usage);
        text.push('\t');
        text.push_str(spec.description);
        text.push('\n');
    }
    session.out(text);
    Ok(Flow::Done)
}

fn exit(session: &mut Session, _token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    session.close();
    Ok(Flow::Done)
}

//-----------------------------------------------------------------------------
// Shared Helpers
//-----------------------------------------------------------------------------

/// An account argument after key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    /// Registry index when the argument named a stored key
    pub key: Option<usize>,
}

/// Resolve a key token to its default wallet address, or take the token
/// as a literal address.
pub fn resolve_account(session: &Session, token: &str, need_private_key: bool) -> CliResult<Account> {
    if token.is_empty() {
        return Err(CliError::validation("account address is empty"));
    }
    if token == "none" && !need_private_key {
        return Ok(Account {
            address: String::new(),
            key: None,
        });
    }
    if let Ok(index) = session.keys().lookup(token) {
        return Ok(Account {
            address: wallet_address(session, index)?,
            key: Some(index),
        });
    }
    if need_private_key {
        return Err(CliError::validation("Don't have a private key for this address"));
    }
    Ok(Account {
        address: token.to_string(),
        key: None,
    })
}

/// Parse an optional role index; an empty word means "not given"
pub fn parse_index(word: &str) -> CliResult<Option<u32>> {
    if word.is_empty() {
        return Ok(None);
    }
    word.parse::<u32>()
        .map(Some)
        .map_err(|_| CliError::validation(format!("Invalid index `{}`", word)))
}

/// Parse a flag argument, `default` when empty. Only `0`, `false` and
/// `FALSE` read as false.
pub fn parse_bool(word: &str, default: bool) -> bool {
    match word {
        "" => default,
        "0" | "false" | "FALSE" => false,
        _ => true,
    }
}

pub fn record(session: &Session, index: usize) -> CliResult<KeyRecord> {
    session
        .keys()
        .get(index)
        .cloned()
        .ok_or_else(|| CliError::validation("Invalid key id"))
}

pub fn public_key(session: &Session, index: usize) -> CliResult<PublicKey> {
    Ok(PublicKey::parse(&record(session, index)?.public_key)?)
}

pub fn wallet_address(session: &Session, index: usize) -> CliResult<String> {
    let key = public_key(session, index)?;
    Ok(session.deriver().derive(&key, Role::Wallet, None)?.serialized_address)
}

pub fn input_key(record: &KeyRecord, password: &str) -> InputKey {
    InputKey::Regular {
        key: Key {
            public_key: record.public_key.clone(),
            secret: record.secret.clone(),
        },
        local_password: SecureBytes::from_text(password),
    }
}

/// `  #N: Public key: <id>     Address: <wallet address>`
pub fn dump_key(session: &mut Session, index: usize) -> CliResult<()> {
    let id = record(session, index)?.public_key;
    let address = wallet_address(session, index)?;
    session.out(format!("  #{}: Public key: {}     Address: {}\n", index, id, address));
    Ok(())
}

pub fn dump_keys(session: &mut Session) -> CliResult<()> {
    session.out(format!("Got {} keys\n", session.keys().len()));
    for index in 0..session.keys().len() {
        dump_key(session, index)?;
    }
    Ok(())
}

pub fn key_header(session: &mut Session, index: usize) -> CliResult<()> {
    let id = record(session, index)?.public_key;
    session.out(format!("Key #{}\npublic key: {}\n", index, id));
    Ok(())
}

/// Ask for the key's password, export the raw private key and continue
/// with it.
pub fn with_signing_key<F>(session: &mut Session, token: &CommandToken, index: usize, then: F) -> CliResult<Flow>
where
    F: FnOnce(&mut Session, SigningKey) -> CliResult<Flow> + 'static,
{
    key_header(session, index)?;
    let next = token.clone();
    session.suspend(token, PASSWORD_PROMPT, move |session, password| {
        let record = record(session, index)?;
        let request = Request::ExportUnencryptedKey {
            input_key: input_key(&record, password),
        };
        session.send_query(&next, request, move |session, exported: ExportedUnencryptedKey| {
            let key = signing_key(&exported.data)?;
            if public_key_of(&key) != PublicKey::parse(&record.public_key)? {
                return Err(CliError::validation("Exported key does not match the stored public key"));
            }
            then(session, key)
        })
    })
}

fn signing_key(data: &SecureBytes) -> CliResult<SigningKey> {
    let bytes: Zeroizing<[u8; 32]> = Zeroizing::new(
        data.as_bytes()
            .try_into()
            .map_err(|_| CliError::validation("Exported key has unexpected length"))?,
    );
    Ok(SigningKey::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("").unwrap(), None);
        assert_eq!(parse_index("0").unwrap(), Some(0));
        assert_eq!(parse_index("12").unwrap(), Some(12));
        assert!(parse_index("-1").is_err());
        assert!(parse_index("abc").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("", true));
        assert!(!parse_bool("", false));
        assert!(!parse_bool("0", true));
        assert!(!parse_bool("false", true));
        assert!(!parse_bool("FALSE", true));
        assert!(parse_bool("1", false));
        assert!(parse_bool("no", false));
        assert!(parse_bool("False", false));
    }

    #[test]
    fn test_signing_key_length() {
        assert!(signing_key(&SecureBytes::new(vec![7u8; 32])).is_ok());
        assert!(signing_key(&SecureBytes::new(vec![7u8; 31])).is_err());
    }
}
