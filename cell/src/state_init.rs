// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::{Address, Cell, CellBuilder, CellError, TreeNode};

/// Contract state-init (code and data) for deployment
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StateInit {
    pub code: Option<Cell>,
    pub data: Option<Cell>,
}

impl StateInit {
    /// Create a state-init from code and data cells
    pub fn new(code: Cell, data: Cell) -> Self {
        Self {
            code: Some(code),
            data: Some(data),
        }
    }

    /// Serialise to a cell (no split depth, no special flags, no libraries)
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();

        b.store_bit(false)?;
        b.store_bit(false)?;
        b.store_maybe_ref(self.code.as_ref())?;
        b.store_maybe_ref(self.data.as_ref())?;
        b.store_bit(false)?;

        b.build()
    }

    /// Contract address resulting from this state-init on the provided workchain
    pub fn address(&self, workchain: i8) -> Result<Address, CellError> {
        let c = self.to_cell()?;
        Ok(Address::new(workchain, c.hash()))
    }
}
