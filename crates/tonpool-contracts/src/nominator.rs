// Nominator contract: `pool:MsgAddressInt index:uint32`

use tonlib_core::cell::{Cell, CellBuilder};

use crate::address::TonAddress;
use crate::error::Result;
use crate::state::StateInit;
use crate::templates::ContractTemplates;

pub struct Nominator;

impl Nominator {
    pub fn init_data(pool: &TonAddress, index: u32) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_address(pool)?.store_u32(32, index)?;
        Ok(builder.build()?)
    }

    pub fn state_init<T: ContractTemplates>(templates: &T, pool: &TonAddress, index: u32) -> Result<StateInit> {
        Ok(StateInit::new(
            templates.nominator_code().clone(),
            Self::init_data(pool, index)?.to_arc(),
        ))
    }
}
