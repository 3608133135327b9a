// Shared harness: a recording node client and a session writing to memory

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tonpool_cli::api::{KeyStoreType, Options, Request, SecureBytes};
use tonpool_cli::error::CliResult;
use tonpool_cli::keys::{KeyRecord, KeyRegistry, KeyStore, MemoryKeyStore};
use tonpool_cli::node::NodeClient;
use tonpool_cli::terminal::BufferTerminal;
use tonpool_cli::Session;
use tonpool_contracts::wallet::public_key_of;
use tonpool_contracts::{AddressDeriver, PoolParams, PublicKey, SigningKey, TemplateSet};

pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Remembers every request instead of sending it
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub sent: Rc<RefCell<Vec<(u64, Request)>>>,
}

impl RecordingClient {
    pub fn requests(&self) -> Vec<(u64, Request)> {
        self.sent.borrow().clone()
    }

    pub fn last(&self) -> (u64, Request) {
        self.sent.borrow().last().cloned().expect("no request sent")
    }

    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl NodeClient for RecordingClient {
    fn request(&mut self, id: u64, request: Request) -> CliResult<()> {
        self.sent.borrow_mut().push((id, request));
        Ok(())
    }
}

pub struct Harness {
    pub session: Session,
    pub client: RecordingClient,
    pub terminal: BufferTerminal,
}

impl Harness {
    pub fn with_keys(records: Vec<KeyRecord>) -> Self {
        Self::with_store(Box::new(MemoryKeyStore::new(records)))
    }

    pub fn with_store(store: Box<dyn KeyStore>) -> Self {
        let client = RecordingClient::default();
        let terminal = BufferTerminal::new();
        let session = Session::new(
            KeyRegistry::load(store).unwrap(),
            deriver(),
            Box::new(terminal.clone()),
        )
        .with_client(Box::new(client.clone()), in_memory_options());
        Self {
            session,
            client,
            terminal,
        }
    }

    pub fn line(&mut self, line: &str) -> String {
        self.session.handle_line(line);
        self.terminal.take()
    }
}

pub fn deriver() -> AddressDeriver {
    AddressDeriver::new(TemplateSet::bundled().unwrap(), PoolParams::default(), DEFAULT_WALLET_ID)
}

pub fn in_memory_options() -> Options {
    Options {
        config: None,
        keystore_type: KeyStoreType::InMemory,
    }
}

/// A stored key whose id is derived from `[seed; 32]` as raw public key
pub fn record(seed: u8) -> KeyRecord {
    KeyRecord::new(
        PublicKey::from_bytes([seed; 32]).serialize(),
        SecureBytes::new(vec![seed; 8]),
    )
}

/// A stored key backed by a real signing key, for flows that sign
pub fn signing_record(seed: u8) -> (KeyRecord, SigningKey) {
    let key = SigningKey::from_bytes(&[seed; 32]);
    let record = KeyRecord::new(public_key_of(&key).serialize(), SecureBytes::new(vec![seed; 8]));
    (record, key)
}
