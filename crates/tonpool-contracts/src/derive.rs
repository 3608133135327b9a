//! Deterministic address derivation
//!
//! Every contract in the family is addressed by the hash of its initial
//! state, so addresses follow from a public key, a role and an index:
//!
//! - `wallet`: wallet state for `(key, wallet_id)` in the base workchain
//! - `owner`: the wallet with id 0
//! - `pool`: pool state for the owner address and fixed parameters
//! - `nominator`: nominator state for `(pool, index)` in the masterchain

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::address::{user_friendly, PublicKey, TonAddress, BASE_WORKCHAIN, MASTERCHAIN};
use crate::error::{ContractError, Result};
use crate::nominator::Nominator;
use crate::pool::{PoolParams, StakingPool};
use crate::state::StateInit;
use crate::templates::{ContractTemplates, TemplateSet};
use crate::wallet::WalletV3;

/// Contract role within the staking family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Wallet,
    Owner,
    Pool,
    Nominator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Wallet => "wallet",
            Role::Owner => "owner",
            Role::Pool => "pool",
            Role::Nominator => "nominator",
        }
    }

    /// Workchain the role's contract lives in
    pub fn workchain(&self) -> i32 {
        match self {
            Role::Nominator => MASTERCHAIN,
            _ => BASE_WORKCHAIN,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wallet" => Ok(Role::Wallet),
            "owner" => Ok(Role::Owner),
            "pool" => Ok(Role::Pool),
            "nominator" => Ok(Role::Nominator),
            _ => Err(ContractError::derivation(
                "Incorrect SMC type use wallet/owner/pool/nominator",
            )),
        }
    }
}

/// Result of a derivation; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAddress {
    pub serialized_address: String,
    pub address: TonAddress,
    pub role: Role,
    pub owner_public_key_id: String,
    pub role_index: u32,
}

/// Full derivation including the initial state, used to deploy contracts
#[derive(Debug, Clone)]
pub struct Derivation {
    pub state: StateInit,
    pub address: DerivedAddress,
}

/// Maps `(public key, role, index)` to contract states and addresses
#[derive(Debug, Clone)]
pub struct AddressDeriver<T: ContractTemplates = TemplateSet> {
    templates: T,
    pool_params: PoolParams,
    default_wallet_id: u32,
}

impl<T: ContractTemplates> AddressDeriver<T> {
    pub fn new(templates: T, pool_params: PoolParams, default_wallet_id: u32) -> Self {
        Self {
            templates,
            pool_params,
            default_wallet_id,
        }
    }

    pub fn templates(&self) -> &T {
        &self.templates
    }

    pub fn default_wallet_id(&self) -> u32 {
        self.default_wallet_id
    }

    /// Replace the default wallet id, normally with the node's reported value
    pub fn set_default_wallet_id(&mut self, wallet_id: u32) {
        self.default_wallet_id = wallet_id;
    }

    /// Derive the serialized address of a contract
    pub fn derive(&self, public_key: &PublicKey, role: Role, role_index: Option<u32>) -> Result<DerivedAddress> {
        self.resolve(public_key, role, role_index).map(|d| d.address)
    }

    /// Derive the address together with the initial state behind it
    pub fn resolve(&self, public_key: &PublicKey, role: Role, role_index: Option<u32>) -> Result<Derivation> {
        let index = self.validate_index(role, role_index)?;
        let state = self.state_for(public_key, role, index).map_err(into_derivation)?;
        let address = state.address(role.workchain()).map_err(into_derivation)?;
        let serialized_address = user_friendly(&address);
        trace!(role = %role, index, address = %serialized_address, "derived address");

        Ok(Derivation {
            state,
            address: DerivedAddress {
                serialized_address,
                address,
                role,
                owner_public_key_id: public_key.serialize(),
                role_index: index,
            },
        })
    }

    fn validate_index(&self, role: Role, role_index: Option<u32>) -> Result<u32> {
        let index = role_index.unwrap_or(0);
        match role {
            Role::Wallet if index == 0 => Ok(self.default_wallet_id),
            Role::Wallet => Ok(index),
            Role::Owner | Role::Pool if index != 0 => Err(ContractError::derivation(format!(
                "Incorrect Wallet ID for {}. Must be unspecified or zero.",
                role
            ))),
            Role::Owner | Role::Pool => Ok(0),
            Role::Nominator if index == 0 => Err(ContractError::derivation(
                "Incorrect Wallet ID for nominator. Must be specified and greater than zero.",
            )),
            Role::Nominator => Ok(index),
        }
    }

    fn state_for(&self, public_key: &PublicKey, role: Role, index: u32) -> Result<StateInit> {
        match role {
            Role::Wallet | Role::Owner => WalletV3::state_init(&self.templates, public_key, index),
            Role::Pool => self.pool_state(public_key),
            Role::Nominator => {
                let pool = self.pool_state(public_key)?.address(Role::Pool.workchain())?;
                Nominator::state_init(&self.templates, &pool, index)
            }
        }
    }

    fn pool_state(&self, public_key: &PublicKey) -> Result<StateInit> {
        let owner = WalletV3::state_init(&self.templates, public_key, 0)?.address(Role::Owner.workchain())?;
        StakingPool::state_init(&self.templates, &self.pool_params, &owner)
    }
}

fn into_derivation(err: ContractError) -> ContractError {
    match err {
        ContractError::Derivation { .. } => err,
        other => ContractError::derivation(other.to_string()),
    }
}
