//! Key Registry
//!
//! Ordered list of key pairs known to the console. The registry is loaded
//! once at start-up and written back through its [`KeyStore`] after every
//! mutation. Keys are addressed by `#N`, by plain index or by a
//! case-insensitive prefix of their public key id.

pub mod store;

use tracing::info;

use crate::api::SecureBytes;
use crate::error::{CliResult, LookupError};
pub use store::{KeyDbFile, KeyStore, MemoryKeyStore};

/// Shortest prefix accepted for key lookup
pub const MIN_PREFIX_LEN: usize = 3;

/// A stored key pair; the secret is the node client's encrypted blob
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub public_key: String,
    pub secret: SecureBytes,
}

impl KeyRecord {
    pub fn new(public_key: impl Into<String>, secret: SecureBytes) -> Self {
        Self {
            public_key: public_key.into(),
            secret,
        }
    }
}

pub struct KeyRegistry {
    records: Vec<KeyRecord>,
    store: Box<dyn KeyStore>,
}

impl KeyRegistry {
    /// Load all records from `store`; a corrupt store is fatal
    pub fn load(store: Box<dyn KeyStore>) -> CliResult<Self> {
        let records = store.load()?;
        info!(keys = records.len(), "key registry loaded");
        Ok(Self { records, store })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&KeyRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.iter()
    }

    /// Resolve a key token to an index
    pub fn lookup(&self, token: &str) -> Result<usize, LookupError> {
        if token.is_empty() {
            return Err(LookupError::NotFound("Empty key id".to_string()));
        }

        if let Some(ordinal) = token.strip_prefix('#') {
            return match ordinal.parse::<usize>() {
                Ok(index) if index < self.records.len() => Ok(index),
                _ => Err(LookupError::NotFound("Invalid key id".to_string())),
            };
        }

        if let Ok(index) = token.parse::<usize>() {
            if index < self.records.len() {
                return Ok(index);
            }
        }

        if token.len() < MIN_PREFIX_LEN {
            return Err(LookupError::NotFound("Too short key id".to_string()));
        }

        let prefix = token.to_lowercase();
        let mut matches = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.public_key.to_lowercase().starts_with(&prefix))
            .map(|(index, _)| index);

        match (matches.next(), matches.next()) {
            (None, _) => Err(LookupError::NotFound("Unknown key prefix".to_string())),
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(LookupError::Ambiguous("Non unique key prefix".to_string())),
        }
    }

    /// Add a record and persist the registry; returns its index
    pub fn append(&mut self, record: KeyRecord) -> CliResult<usize> {
        self.records.push(record);
        self.store.save(&self.records)?;
        Ok(self.records.len() - 1)
    }

    /// Remove every record and persist the empty registry
    pub fn clear(&mut self) -> CliResult<()> {
        self.records.clear();
        self.store.save(&self.records)?;
        info!("key registry cleared");
        Ok(())
    }
}
