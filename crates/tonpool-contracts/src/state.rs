// Initial account state: code and data cells plus the address they hash to

use tonlib_core::cell::{ArcCell, Cell, CellBuilder};

use crate::address::TonAddress;
use crate::error::Result;

/// `StateInit` with code and data present and no special fields
#[derive(Debug, Clone)]
pub struct StateInit {
    pub code: ArcCell,
    pub data: ArcCell,
}

impl StateInit {
    pub fn new(code: ArcCell, data: ArcCell) -> Self {
        Self { code, data }
    }

    /// `split_depth:nothing special:nothing code:just data:just library:empty`
    pub fn to_cell(&self) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u8(5, 0b00110)?
            .store_reference(&self.code)?
            .store_reference(&self.data)?;
        Ok(builder.build()?)
    }

    /// Address of an account initialized with this state
    pub fn address(&self, workchain: i32) -> Result<TonAddress> {
        Ok(TonAddress::new(workchain, &self.to_cell()?.cell_hash()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{BASE_WORKCHAIN, MASTERCHAIN};

    fn state(tag: u8) -> StateInit {
        let mut code = CellBuilder::new();
        code.store_u8(8, tag).unwrap();
        let mut data = CellBuilder::new();
        data.store_u32(32, 7).unwrap();
        StateInit::new(code.build().unwrap().to_arc(), data.build().unwrap().to_arc())
    }

    #[test]
    fn test_address_follows_state_hash() {
        let a = state(1);
        assert_eq!(a.address(BASE_WORKCHAIN).unwrap().hash_part, a.to_cell().unwrap().cell_hash());
        assert_ne!(a.address(BASE_WORKCHAIN).unwrap(), state(2).address(BASE_WORKCHAIN).unwrap());
    }

    #[test]
    fn test_workchain_does_not_change_hash() {
        let s = state(3);
        let base = s.address(BASE_WORKCHAIN).unwrap();
        let master = s.address(MASTERCHAIN).unwrap();
        assert_eq!(base.hash_part, master.hash_part);
        assert_ne!(base, master);
    }
}
