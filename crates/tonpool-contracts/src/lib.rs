//! Contract envelope for the staking pool family
//!
//! Wallet, pool and nominator data layouts on top of `tonlib-core` cells,
//! public key identifiers, and the deterministic address derivation built
//! on them.

pub mod address;
pub mod boc;
pub mod cell;
pub mod derive;
pub mod error;
pub mod grams;
pub mod nominator;
pub mod pool;
pub mod state;
pub mod templates;
pub mod wallet;

pub use address::{user_friendly, PublicKey, TonAddress, BASE_WORKCHAIN, MASTERCHAIN};
pub use cell::{ArcCell, Cell, CellBuilder, CellBuilderExt};
pub use derive::{AddressDeriver, Derivation, DerivedAddress, Role};
pub use error::{ContractError, Result, DERIVATION_ERROR_CODE};
pub use grams::Grams;
pub use nominator::Nominator;
pub use pool::{PoolParams, StakingPool};
pub use state::StateInit;
pub use templates::{ContractTemplates, TemplatePaths, TemplateSet};
pub use wallet::{Transfer, WalletData, WalletV3};

/// Ed25519 signing key type used for external messages
pub use ed25519_dalek::SigningKey;
