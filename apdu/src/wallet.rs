// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet v4 contract derivation
//!
//! The wallet contract code is supplied by the caller, the data cell is
//! derived from the device public key.

use ledger_ton_cell::{Address, Cell, CellBuilder, StateInit};

use crate::{flags::Chain, transfer::DEFAULT_SUBWALLET_ID, ApduError};

/// Default subwallet id for a chain (offset by workchain)
pub fn default_subwallet_id(chain: Chain) -> u32 {
    DEFAULT_SUBWALLET_ID.wrapping_add_signed(chain.workchain() as i32)
}

/// Initial wallet v4 data cell
///
/// ```text
/// seqno:u32 = 0, subwallet:u32, public_key:bits256, plugins:(Maybe ^Cell) = 0
/// ```
pub fn wallet_v4_data(public_key: &[u8; 32], subwallet_id: u32) -> Result<Cell, ApduError> {
    let mut b = CellBuilder::new();

    b.store_uint(0, 32)?;
    b.store_uint(subwallet_id as u128, 32)?;
    b.store_bytes(public_key)?;
    b.store_bit(false)?;

    Ok(b.build()?)
}

/// Wallet v4 state-init for the provided code and public key
pub fn wallet_v4_state_init(
    code: &Cell,
    public_key: &[u8; 32],
    chain: Chain,
) -> Result<StateInit, ApduError> {
    let data = wallet_v4_data(public_key, default_subwallet_id(chain))?;
    Ok(StateInit::new(code.clone(), data))
}

/// Wallet v4 contract address for the provided code and public key
pub fn wallet_v4_address(
    code: &Cell,
    public_key: &[u8; 32],
    chain: Chain,
) -> Result<Address, ApduError> {
    let s = wallet_v4_state_init(code, public_key, chain)?;
    Ok(s.address(chain.workchain())?)
}

#[cfg(test)]
mod test {
    use ledger_ton_cell::TreeNode;

    use super::*;

    #[test]
    fn subwallet_ids() {
        assert_eq!(default_subwallet_id(Chain::Base), 698_983_191);
        assert_eq!(default_subwallet_id(Chain::Master), 698_983_190);
    }

    #[test]
    fn data_layout() {
        let d = wallet_v4_data(&[0x55; 32], 698_983_191).unwrap();

        assert_eq!(d.bit_len(), 32 + 32 + 256 + 1);
        assert_eq!(&d.data()[..4], &[0, 0, 0, 0]);
        assert_eq!(&d.data()[4..8], &698_983_191u32.to_be_bytes());
        assert_eq!(&d.data()[8..40], &[0x55; 32]);
    }

    #[test]
    fn address_depends_on_key_and_chain() {
        let code = Cell::empty();

        let a = wallet_v4_address(&code, &[1u8; 32], Chain::Base).unwrap();
        let b = wallet_v4_address(&code, &[2u8; 32], Chain::Base).unwrap();
        let m = wallet_v4_address(&code, &[1u8; 32], Chain::Master).unwrap();

        assert_eq!(a.workchain, 0);
        assert_eq!(m.workchain, -1);
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.hash, m.hash);

        let s = wallet_v4_state_init(&code, &[1u8; 32], Chain::Base).unwrap();
        assert_eq!(a.hash, s.to_cell().unwrap().hash());
    }
}
