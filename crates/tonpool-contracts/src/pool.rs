// Staking pool contract: data layout and owner requests
//
// Data: `min_stake max_stake owner_fee validator_fee` (uint32 each)
// followed by the owner address.

use serde::Deserialize;
use tonlib_core::cell::{Cell, CellBuilder};

use crate::address::TonAddress;
use crate::error::Result;
use crate::state::StateInit;
use crate::templates::ContractTemplates;

/// Pool initialization request
pub const OP_INIT: u32 = 0x4e73_744b;

/// Change the status of a registered nominator
pub const OP_SET_NOMINATOR_STATUS: u32 = 0x736e_7331;

const ADDRESSES_PER_CELL: usize = 3;

/// Fixed parameters baked into every pool's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolParams {
    pub min_stake: u32,
    pub max_stake: u32,
    pub owner_fee: u32,
    pub validator_fee: u32,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            min_stake: 1000,
            max_stake: 10000,
            owner_fee: 500,
            validator_fee: 500,
        }
    }
}

pub struct StakingPool;

impl StakingPool {
    pub fn init_data(params: &PoolParams, owner: &TonAddress) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u32(32, params.min_stake)?
            .store_u32(32, params.max_stake)?
            .store_u32(32, params.owner_fee)?
            .store_u32(32, params.validator_fee)?
            .store_address(owner)?;
        Ok(builder.build()?)
    }

    pub fn state_init<T: ContractTemplates>(templates: &T, params: &PoolParams, owner: &TonAddress) -> Result<StateInit> {
        Ok(StateInit::new(
            templates.pool_code().clone(),
            Self::init_data(params, owner)?.to_arc(),
        ))
    }

    /// `op:uint32 query_id:uint64 count:uint16` and a chain of address cells
    pub fn init_message(nominators: &[TonAddress]) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u32(32, OP_INIT)?
            .store_u64(64, 0)?
            .store_u32(16, nominators.len() as u32)?;
        if let Some(chain) = address_chain(nominators)? {
            builder.store_child(chain)?;
        }
        Ok(builder.build()?)
    }

    pub fn set_nominator_status_request(nominator: &TonAddress, status: u32, query_id: u64) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u32(32, OP_SET_NOMINATOR_STATUS)?
            .store_u64(64, query_id)?
            .store_address(nominator)?
            .store_u32(32, status)?;
        Ok(builder.build()?)
    }
}

// Built back to front so each cell references the next chunk.
fn address_chain(addresses: &[TonAddress]) -> Result<Option<Cell>> {
    let mut next: Option<Cell> = None;
    for chunk in addresses.chunks(ADDRESSES_PER_CELL).rev() {
        let mut builder = CellBuilder::new();
        for address in chunk {
            builder.store_address(address)?;
        }
        if let Some(tail) = next.take() {
            builder.store_child(tail)?;
        }
        next = Some(builder.build()?);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(n: u8) -> Vec<TonAddress> {
        (0..n).map(|i| TonAddress::new(-1, &[i; 32])).collect()
    }

    #[test]
    fn test_init_data_layout() {
        let owner = TonAddress::new(0, &[5u8; 32]);
        let data = StakingPool::init_data(&PoolParams::default(), &owner).unwrap();
        let mut parser = data.parser();
        assert_eq!(parser.load_u32(32).unwrap(), 1000);
        assert_eq!(parser.load_u32(32).unwrap(), 10000);
        assert_eq!(parser.load_u32(32).unwrap(), 500);
        assert_eq!(parser.load_u32(32).unwrap(), 500);
        assert_eq!(parser.load_address().unwrap(), owner);
        assert_eq!(parser.remaining_bits(), 0);
    }

    #[test]
    fn test_init_message_chains_nominators() {
        let message = StakingPool::init_message(&addresses(9)).unwrap();
        let mut depth = 0;
        let mut cell: &Cell = &message;
        while let Some(next) = cell.references().first() {
            depth += 1;
            cell = &**next;
        }
        assert_eq!(depth, 3);

        let empty = StakingPool::init_message(&[]).unwrap();
        assert!(empty.references().is_empty());
    }

    #[test]
    fn test_set_status_request() {
        let nominator = TonAddress::new(-1, &[3u8; 32]);
        let request = StakingPool::set_nominator_status_request(&nominator, 2, 0).unwrap();
        let mut parser = request.parser();
        assert_eq!(parser.load_u32(32).unwrap(), OP_SET_NOMINATOR_STATUS);
        assert_eq!(parser.load_u64(64).unwrap(), 0);
        assert_eq!(parser.load_address().unwrap(), nominator);
        assert_eq!(parser.load_u32(32).unwrap(), 2);
    }
}
