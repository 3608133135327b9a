// Key store backends
//
// The file backend keeps one record per line, `<public key id> <base64
// secret>`, and rewrites the whole file atomically through a temporary
// sibling.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::KeyRecord;
use crate::api::SecureBytes;
use crate::error::{CliError, CliResult};

/// File name of the key database inside the key directory
pub const KEY_DB_FILE: &str = "key_db";

/// Persistence primitives for the key registry
pub trait KeyStore {
    fn load(&self) -> CliResult<Vec<KeyRecord>>;
    fn save(&mut self, records: &[KeyRecord]) -> CliResult<()>;
}

/// `<key_dir>/key_db`
#[derive(Debug, Clone)]
pub struct KeyDbFile {
    path: PathBuf,
}

impl KeyDbFile {
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            path: key_dir.as_ref().join(KEY_DB_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for KeyDbFile {
    fn load(&self) -> CliResult<Vec<KeyRecord>> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => Zeroizing::new(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no key database, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        parse_records(&content).map_err(|line| {
            CliError::Fatal(format!(
                "Invalid secret database at {} (line {})",
                self.path.display(),
                line
            ))
        })
    }

    fn save(&mut self, records: &[KeyRecord]) -> CliResult<()> {
        let mut content = Zeroizing::new(String::new());
        for record in records {
            content.push_str(&record.public_key);
            content.push(' ');
            content.push_str(&record.secret.to_base64());
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        fs_err::write(&tmp, content.as_bytes())?;
        fs_err::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = records.len(), "key database written");
        Ok(())
    }
}

/// Keeps records only in memory, for `--in-memory` sessions
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: Vec<KeyRecord>,
}

impl MemoryKeyStore {
    pub fn new(records: Vec<KeyRecord>) -> Self {
        Self { records }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> CliResult<Vec<KeyRecord>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[KeyRecord]) -> CliResult<()> {
        self.records = records.to_vec();
        Ok(())
    }
}

// On failure returns the 1-based number of the offending line.
fn parse_records(content: &str) -> Result<Vec<KeyRecord>, usize> {
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let mut words = line.split_whitespace();
        let Some(public_key) = words.next() else {
            continue;
        };
        let Some(secret) = words.next() else {
            warn!(line = number + 1, "key record without secret");
            return Err(number + 1);
        };
        let secret = SecureBytes::from_base64(secret).ok_or(number + 1)?;
        records.push(KeyRecord::new(normalize_public_key(public_key), secret));
    }
    Ok(records)
}

/// Ids written with the standard alphabet are converted to base64url
pub fn normalize_public_key(id: &str) -> String {
    id.replace('+', "-").replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let records = parse_records("Pu+a/b c2VjcmV0\n\nPuxyz c2VjcmV0Mg==\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].public_key, "Pu-a_b");
        assert_eq!(records[1].secret.as_bytes(), b"secret2");
    }

    #[test]
    fn test_parse_reports_bad_line() {
        assert_eq!(parse_records("Puabc c2VjcmV0\nPudef !!!\n").unwrap_err(), 2);
        assert_eq!(parse_records("Puabc\n").unwrap_err(), 1);
    }

    #[test]
    fn test_corrupt_key_db_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyDbFile::new(dir.path());
        fs_err::write(store.path(), "Puabc c2VjcmV0\nPudef not*base64\n").unwrap();

        match store.load() {
            Err(CliError::Fatal(message)) => {
                assert!(message.contains("Invalid secret database"));
                assert!(message.contains("line 2"));
            }
            other => panic!("expected a fatal error, got {:?}", other.map(|records| records.len())),
        }
    }

    #[test]
    fn test_missing_key_db_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(KeyDbFile::new(dir.path()).load().unwrap().is_empty());
    }
}
