// Key commands: generation, import, export and deletion

use rand::RngCore;
use tracing::info;
use zeroize::Zeroizing;

use super::{dump_key, dump_keys, input_key, key_header, record, CHOOSE_KEY_PROMPT, PASSWORD_PROMPT};
use crate::api::{Acknowledged, Bip39Hints, ExportedKey, ExportedPemKey, Key, Request, SecureBytes};
use crate::dispatch::Args;
use crate::error::CliResult;
use crate::keys::KeyRecord;
use crate::session::{CommandToken, Flow, Session};

/// Bytes of typed entropy required before a key is generated
pub const MIN_ENTROPY: usize = 20;

/// Words in a mnemonic
pub const MNEMONIC_WORDS: usize = 24;

/// Phrase the user must type to delete every key
pub const DELETE_ALL_PHRASE: &str = "I have written down mnemonic words";

const EXTRA_SEED_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Words,
    Pem,
}

//-----------------------------------------------------------------------------
// Generation and Import
//-----------------------------------------------------------------------------

pub fn genkey(session: &mut Session, token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    collect_entropy(session, token, Zeroizing::new(Vec::new()))
}

fn collect_entropy(session: &mut Session, token: &CommandToken, entropy: Zeroizing<Vec<u8>>) -> CliResult<Flow> {
    let next = token.clone();
    if entropy.len() < MIN_ENTROPY {
        return session.suspend(token, "Enter some entropy", move |session, line| {
            let mut entropy = entropy;
            entropy.extend_from_slice(line.as_bytes());
            collect_entropy(session, &next, entropy)
        });
    }
    session.suspend(token, PASSWORD_PROMPT, move |session, password| {
        create_key(session, &next, entropy, SecureBytes::from_text(password))
    })
}

fn create_key(
    session: &mut Session,
    token: &CommandToken,
    entropy: Zeroizing<Vec<u8>>,
    password: SecureBytes,
) -> CliResult<Flow> {
    let mut seed = entropy.to_vec();
    let mut extra = [0u8; EXTRA_SEED_BYTES];
    rand::thread_rng().fill_bytes(&mut extra);
    seed.extend_from_slice(&extra);

    let request = Request::CreateNewKey {
        local_password: password.clone(),
        mnemonic_password: SecureBytes::default(),
        random_extra_seed: SecureBytes::new(seed),
    };
    let next = token.clone();
    session.send_query(token, request, move |session, key: Key| store_and_export(session, &next, key, password))
}

pub fn importkey(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    collect_words(session, token, Vec::new(), args.rest())
}

fn collect_words(
    session: &mut Session,
    token: &CommandToken,
    mut words: Vec<SecureBytes>,
    text: &str,
) -> CliResult<Flow> {
    words.extend(text.split_whitespace().map(SecureBytes::from_text));
    let next = token.clone();
    if words.len() < MNEMONIC_WORDS {
        let prompt = format!("Enter mnemonic words (got {} out of {})", words.len(), MNEMONIC_WORDS);
        return session.suspend(token, &prompt, move |session, line| {
            collect_words(session, &next, words, line)
        });
    }
    session.suspend(token, PASSWORD_PROMPT, move |session, password| {
        let password = SecureBytes::from_text(password);
        let request = Request::ImportKey {
            local_password: password.clone(),
            mnemonic_password: SecureBytes::default(),
            exported_key: ExportedKey { word_list: words },
        };
        let then = next.clone();
        session.send_query(&next, request, move |session, key: Key| {
            store_and_export(session, &then, key, password)
        })
    })
}

fn store_and_export(session: &mut Session, token: &CommandToken, key: Key, password: SecureBytes) -> CliResult<Flow> {
    info!(public_key = %key.public_key, "key added");
    let index = session
        .keys_mut()
        .append(KeyRecord::new(key.public_key, key.secret))?;
    export_words(session, token, index, password)
}

//-----------------------------------------------------------------------------
// Listing and Export
//-----------------------------------------------------------------------------

pub fn list(session: &mut Session, _token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    dump_keys(session)?;
    Ok(Flow::Done)
}

pub fn exportkey(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    export(session, token, ExportFormat::Words, args.word())
}

pub fn exportkeypem(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    export(session, token, ExportFormat::Pem, args.word())
}

fn export(session: &mut Session, token: &CommandToken, format: ExportFormat, key: &str) -> CliResult<Flow> {
    let next = token.clone();
    if key.is_empty() {
        dump_keys(session)?;
        return session.suspend(token, CHOOSE_KEY_PROMPT, move |session, line| {
            export(session, &next, format, line.trim())
        });
    }

    let index = session.keys().lookup(key)?;
    key_header(session, index)?;
    session.suspend(token, PASSWORD_PROMPT, move |session, password| {
        let password = SecureBytes::from_text(password);
        match format {
            ExportFormat::Words => export_words(session, &next, index, password),
            ExportFormat::Pem => {
                let then = next.clone();
                session.suspend(&next, "Enter PEM password", move |session, pem_password| {
                    export_pem(session, &then, index, password, SecureBytes::from_text(pem_password))
                })
            }
        }
    })
}

fn export_words(session: &mut Session, token: &CommandToken, index: usize, password: SecureBytes) -> CliResult<Flow> {
    let record = record(session, index)?;
    let request = Request::ExportKey {
        input_key: input_key(&record, &password.to_text()),
    };
    session.send_query(token, request, move |session, exported: ExportedKey| {
        dump_key(session, index)?;
        for word in &exported.word_list {
            session.out(format!("    {}\n", word.to_text().as_str()));
        }
        Ok(Flow::Done)
    })
}

fn export_pem(
    session: &mut Session,
    token: &CommandToken,
    index: usize,
    password: SecureBytes,
    pem_password: SecureBytes,
) -> CliResult<Flow> {
    let record = record(session, index)?;
    let request = Request::ExportPemKey {
        input_key: input_key(&record, &password.to_text()),
        key_password: pem_password,
    };
    session.send_query(token, request, move |session, exported: ExportedPemKey| {
        dump_key(session, index)?;
        session.out(format!("\n{}\n", exported.pem.to_text().as_str()));
        Ok(Flow::Done)
    })
}

//-----------------------------------------------------------------------------
// Deletion and Hints
//-----------------------------------------------------------------------------

pub fn deletekey(session: &mut Session, _token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    session.out("Deleting a single key is disabled, use deletekeys\n");
    Ok(Flow::Done)
}

pub fn deletekeys(session: &mut Session, token: &CommandToken, _suffix: &str, _args: Args<'_>) -> CliResult<Flow> {
    let prompt = format!(
        "You are going to delete ALL PRIVATE KEYS. To confirm enter `{}`",
        DELETE_ALL_PHRASE
    );
    let next = token.clone();
    session.suspend(token, &prompt, move |session, entered| {
        if entered.trim() != DELETE_ALL_PHRASE {
            session.out("Your keys left intact\n");
            return Ok(Flow::Done);
        }
        session.keys_mut().clear()?;
        info!("all keys deleted");
        session.send_query(&next, Request::DeleteAllKeys, |session, _: Acknowledged| {
            session.out("All your keys have been deleted\n");
            Ok(Flow::Done)
        })
    })
}

pub fn hint(session: &mut Session, token: &CommandToken, _suffix: &str, mut args: Args<'_>) -> CliResult<Flow> {
    let request = Request::GetBip39Hints {
        prefix: args.word().to_string(),
    };
    session.send_query(token, request, |session, hints: Bip39Hints| {
        session.out(format!("{}\n", hints.words.join(" ")));
        Ok(Flow::Done)
    })
}
