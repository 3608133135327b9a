// Derivation properties across roles and indices

use pretty_assertions::assert_eq;
use std::collections::HashSet;

use tonpool_contracts::{
    boc, AddressDeriver, PoolParams, PublicKey, Role, StakingPool, TemplateSet, WalletV3, BASE_WORKCHAIN,
};

const DEFAULT_WALLET_ID: u32 = 698_983_191;

fn deriver(default_wallet_id: u32) -> AddressDeriver {
    AddressDeriver::new(TemplateSet::bundled().unwrap(), PoolParams::default(), default_wallet_id)
}

fn key(seed: u8) -> PublicKey {
    PublicKey::from_bytes([seed; 32])
}

#[test]
fn test_owner_matches_wallet_only_with_zero_default() {
    let pk = key(11);

    let zero = deriver(0);
    assert_eq!(
        zero.derive(&pk, Role::Owner, Some(0)).unwrap().serialized_address,
        zero.derive(&pk, Role::Wallet, Some(0)).unwrap().serialized_address
    );

    let standard = deriver(DEFAULT_WALLET_ID);
    assert_ne!(
        standard.derive(&pk, Role::Owner, Some(0)).unwrap().serialized_address,
        standard.derive(&pk, Role::Wallet, Some(0)).unwrap().serialized_address
    );
}

#[test]
fn test_wallet_address_matches_v3r2_deployment() {
    let d = deriver(DEFAULT_WALLET_ID);
    let wallet = d.derive(&key(1), Role::Wallet, None).unwrap();
    assert_eq!(wallet.serialized_address, "EQDaTeznj5P4JwfMG8w3nke41Mevfsw1aFaJ9YIBojCzkGN5");
    assert_eq!(
        hex::encode(wallet.address.hash_part),
        "da4dece78f93f82707cc1bcc379e47b8d4c7af7ecc35685689f58201a230b390"
    );

    let owner = d.derive(&key(1), Role::Owner, None).unwrap();
    assert_eq!(owner.serialized_address, "EQDbEAv2yxRL3z3NvY9FwpWnVMwh4oHsURO2kVEfNu2YHP79");
}

#[test]
fn test_pool_derivation_is_idempotent() {
    let d = deriver(DEFAULT_WALLET_ID);
    let pk = key(12);
    let first = d.derive(&pk, Role::Pool, Some(0)).unwrap();
    let second = d.derive(&pk, Role::Pool, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.address.workchain, BASE_WORKCHAIN);
}

#[test]
fn test_nominators_are_distinct_per_index() {
    let d = deriver(DEFAULT_WALLET_ID);
    let pk = key(13);
    assert!(d.derive(&pk, Role::Nominator, Some(0)).is_err());

    let addresses: HashSet<String> = (1..=20)
        .map(|i| d.derive(&pk, Role::Nominator, Some(i)).unwrap().serialized_address)
        .collect();
    assert_eq!(addresses.len(), 20);
}

#[test]
fn test_pool_depends_on_owner_key() {
    let d = deriver(DEFAULT_WALLET_ID);
    let a = d.derive(&key(1), Role::Pool, None).unwrap();
    let b = d.derive(&key(2), Role::Pool, None).unwrap();
    assert_ne!(a.address, b.address);
}

#[test]
fn test_pool_state_embeds_owner_address() {
    let d = deriver(DEFAULT_WALLET_ID);
    let pk = key(14);
    let owner = d.derive(&pk, Role::Owner, None).unwrap();
    let pool = d.resolve(&pk, Role::Pool, None).unwrap();

    let expected = StakingPool::init_data(&PoolParams::default(), &owner.address).unwrap();
    assert_eq!(pool.state.data.cell_hash(), expected.cell_hash());
}

#[test]
fn test_state_survives_boc_roundtrip() {
    let d = deriver(DEFAULT_WALLET_ID);
    let pk = key(15);
    let wallet = d.resolve(&pk, Role::Wallet, Some(3)).unwrap();

    let data = boc::deserialize(&boc::serialize(&wallet.state.data).unwrap()).unwrap();
    let parsed = WalletV3::parse_data(&data).unwrap();
    assert_eq!(parsed.wallet_id, 3);
    assert_eq!(parsed.public_key, pk);
}
