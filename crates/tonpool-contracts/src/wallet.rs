// Wallet contract: data layout, init message and external transfers
//
// Data: `seqno:uint32 wallet_id:uint32 public_key:bits256`. External
// bodies are `signature:bits512` followed by the signed fields; the
// signature covers the hash of the unsigned body cell.

use ed25519_dalek::{Signer, SigningKey};
use tonlib_core::cell::{ArcCell, Cell, CellBuilder};

use crate::address::{PublicKey, TonAddress};
use crate::cell::CellBuilderExt;
use crate::error::Result;
use crate::state::StateInit;
use crate::templates::ContractTemplates;

/// `valid_until` used by the init message
pub const NO_EXPIRY: u32 = u32::MAX;

/// Send mode: pay fees separately, ignore errors
pub const SEND_MODE: u8 = 3;

/// Parsed wallet persistent data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletData {
    pub seqno: u32,
    pub wallet_id: u32,
    pub public_key: PublicKey,
}

/// Parameters of a single outgoing transfer
#[derive(Debug, Clone)]
pub struct Transfer {
    pub destination: TonAddress,
    pub bounce: bool,
    pub amount: u64,
    pub body: Option<ArcCell>,
}

pub struct WalletV3;

impl WalletV3 {
    pub fn init_data(public_key: &PublicKey, wallet_id: u32) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u32(32, 0)?
            .store_u32(32, wallet_id)?
            .store_slice(public_key.as_bytes())?;
        Ok(builder.build()?)
    }

    pub fn state_init<T: ContractTemplates>(templates: &T, public_key: &PublicKey, wallet_id: u32) -> Result<StateInit> {
        Ok(StateInit::new(
            templates.wallet_code().clone(),
            Self::init_data(public_key, wallet_id)?.to_arc(),
        ))
    }

    /// First external message, deploying the wallet with `seqno = 0`
    pub fn init_message(key: &SigningKey, wallet_id: u32) -> Result<Cell> {
        let mut body = CellBuilder::new();
        body.store_u32(32, wallet_id)?
            .store_u32(32, NO_EXPIRY)?
            .store_u32(32, 0)?;
        sign(key, &body.build()?)
    }

    /// External message carrying one internal transfer
    pub fn transfer_message(
        key: &SigningKey,
        wallet_id: u32,
        seqno: u32,
        valid_until: u32,
        transfer: &Transfer,
    ) -> Result<Cell> {
        let internal = internal_message(transfer)?;
        let mut body = CellBuilder::new();
        body.store_u32(32, wallet_id)?
            .store_u32(32, valid_until)?
            .store_u32(32, seqno)?
            .store_u8(8, SEND_MODE)?
            .store_child(internal)?;
        sign(key, &body.build()?)
    }

    /// Read seqno, wallet id and key back from account data
    pub fn parse_data(data: &Cell) -> Result<WalletData> {
        let mut parser = data.parser();
        let seqno = parser.load_u32(32)?;
        let wallet_id = parser.load_u32(32)?;
        let mut key = [0u8; 32];
        parser.load_slice(&mut key)?;
        Ok(WalletData {
            seqno,
            wallet_id,
            public_key: PublicKey::from_bytes(key),
        })
    }
}

fn internal_message(transfer: &Transfer) -> Result<Cell> {
    let mut builder = CellBuilder::new();
    // int_msg_info$0 ihr_disabled bounce bounced src:addr_none
    builder
        .store_bit(false)?
        .store_bit(true)?
        .store_bit(transfer.bounce)?
        .store_bit(false)?
        .store_address_none()?
        .store_address(&transfer.destination)?
        .store_grams(transfer.amount)?
        // empty extra currencies, ihr_fee, fwd_fee, created_lt, created_at
        .store_bit(false)?
        .store_grams(0)?
        .store_grams(0)?
        .store_u64(64, 0)?
        .store_u32(32, 0)?
        // no state init
        .store_bit(false)?;
    match &transfer.body {
        Some(body) => {
            builder.store_bit(true)?.store_reference(body)?;
        }
        None => {
            builder.store_bit(false)?;
        }
    }
    Ok(builder.build()?)
}

fn sign(key: &SigningKey, unsigned: &Cell) -> Result<Cell> {
    let signature = key.sign(&unsigned.cell_hash());
    let mut builder = CellBuilder::new();
    builder.store_slice(&signature.to_bytes())?.store_cell(unsigned)?;
    Ok(builder.build()?)
}

/// Public key of a signing key in identifier form
pub fn public_key_of(key: &SigningKey) -> PublicKey {
    PublicKey::from_bytes(key.verifying_key().to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    #[test]
    fn test_init_data_roundtrip() {
        let pk = public_key_of(&key());
        let data = WalletV3::init_data(&pk, 698_983_191).unwrap();
        let parsed = WalletV3::parse_data(&data).unwrap();
        assert_eq!(parsed.seqno, 0);
        assert_eq!(parsed.wallet_id, 698_983_191);
        assert_eq!(parsed.public_key, pk);
    }

    #[test]
    fn test_short_data_is_an_error() {
        let mut builder = CellBuilder::new();
        builder.store_u32(32, 1).unwrap();
        assert!(WalletV3::parse_data(&builder.build().unwrap()).is_err());
    }

    #[test]
    fn test_init_message_signature_verifies() {
        let key = key();
        let message = WalletV3::init_message(&key, 42).unwrap();
        let mut parser = message.parser();
        let mut signature = [0u8; 64];
        parser.load_slice(&mut signature).unwrap();

        let mut unsigned = CellBuilder::new();
        unsigned
            .store_u32(32, 42)
            .unwrap()
            .store_u32(32, NO_EXPIRY)
            .unwrap()
            .store_u32(32, 0)
            .unwrap();
        let unsigned = unsigned.build().unwrap();
        key.verifying_key()
            .verify(&unsigned.cell_hash(), &Signature::from_bytes(&signature))
            .unwrap();
    }

    #[test]
    fn test_transfer_carries_internal_message() {
        let mut body = CellBuilder::new();
        body.store_u32(32, 0).unwrap().store_slice(b"hello").unwrap();
        let transfer = Transfer {
            destination: TonAddress::new(0, &[1u8; 32]),
            bounce: true,
            amount: 1_000_000_000,
            body: Some(body.build().unwrap().to_arc()),
        };
        let message = WalletV3::transfer_message(&key(), 7, 3, 100, &transfer).unwrap();
        assert_eq!(message.references().len(), 1);
        assert_eq!(message.bit_len(), 512 + 32 * 3 + 8);
        assert_eq!(message.references()[0].references().len(), 1);
    }
}
