// Account addresses and public key identifiers
//
// Account addresses are `tonlib-core` values. Public key identifiers are
// 36-byte payloads (tag, key, CRC16/XMODEM) rendered as 48 base64url
// characters.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use crc::{Crc, CRC_16_XMODEM};

pub use tonlib_core::TonAddress;

use crate::error::{ContractError, Result};

/// Workchain used by wallets, owners and pools
pub const BASE_WORKCHAIN: i32 = 0;

/// Workchain used by nominators
pub const MASTERCHAIN: i32 = -1;

const PUBLIC_KEY_TAG: [u8; 2] = [0x3e, 0xe6];

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Bounceable mainnet form, as the node client prints addresses
pub fn user_friendly(address: &TonAddress) -> String {
    address.to_base64_url_flags(false, false)
}

//-----------------------------------------------------------------------------
// Public key
//-----------------------------------------------------------------------------

/// An Ed25519 public key in its tagged, checksummed text form
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Parse the 48-character identifier produced by the node client
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = URL_SAFE
            .decode(text)
            .or_else(|_| STANDARD.decode(text))
            .map_err(|_| ContractError::InvalidPublicKey(format!("`{}` is not base64", text)))?;
        if bytes.len() != 36 {
            return Err(ContractError::InvalidPublicKey(format!("`{}` has wrong length", text)));
        }
        if bytes[..2] != PUBLIC_KEY_TAG {
            return Err(ContractError::InvalidPublicKey(format!("`{}` is not an ed25519 key", text)));
        }
        if CRC16.checksum(&bytes[..34]) != u16::from_be_bytes([bytes[34], bytes[35]]) {
            return Err(ContractError::InvalidPublicKey(format!("`{}` has bad checksum", text)));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[2..34]);
        Ok(Self { bytes: key })
    }

    pub fn serialize(&self) -> String {
        let mut bytes = [0u8; 36];
        bytes[..2].copy_from_slice(&PUBLIC_KEY_TAG);
        bytes[2..34].copy_from_slice(&self.bytes);
        let crc = CRC16.checksum(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());
        URL_SAFE.encode(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.serialize())
    }
}

impl FromStr for PublicKey {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_address_prefixes() {
        let base = TonAddress::new(BASE_WORKCHAIN, &[7u8; 32]);
        let master = TonAddress::new(MASTERCHAIN, &[7u8; 32]);
        assert!(user_friendly(&base).starts_with("EQ"));
        assert!(user_friendly(&master).starts_with("Ef"));
        assert_eq!(user_friendly(&base).len(), 48);
    }

    #[test]
    fn test_public_key_text_form() {
        let key = PublicKey::from_bytes([42u8; 32]);
        let text = key.serialize();
        assert_eq!(text.len(), 48);
        assert!(text.starts_with("Pu"));
        assert_eq!(PublicKey::parse(&text).unwrap(), key);
        assert!(PublicKey::parse("abcd1234").is_err());
    }

    #[test]
    fn test_public_key_checksum() {
        assert_eq!(CRC16.checksum(b"123456789"), 0x31c3);

        let mut text = PublicKey::from_bytes([1u8; 32]).serialize();
        let flipped = if &text[10..11] == "A" { "B" } else { "A" };
        text.replace_range(10..11, flipped);
        assert!(PublicKey::parse(&text).is_err());
    }
}
