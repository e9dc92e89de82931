// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transfer signing requests
//!
//! ## Request encoding
//!
//! ```text
//! +------------+------------------------------+-----------+-------------+
//! | HEADER (1) | [SUBWALLET (4) | WALLET_OP (1)] | SEQNO (4) | TIMEOUT (4) |
//! +------------+------------------------------+-----------+-------------+
//! | AMOUNT (varuint) | TO (33) | BOUNCE (1) | SEND_MODE (1)             |
//! +------------------+---------+------------+---------------------------+
//! | STATE_INIT: 0x00 | 0x01 DEPTH (2) HASH (32)                         |
//! +--------------------------------------------------------------------+
//! | PAYLOAD: 0x00 | 0x01 DEPTH (2) HASH (32) HINTS (...)                |
//! +--------------------------------------------------------------------+
//! ```
//!
//! `HEADER` is `0x01` when wallet specifiers are present.
//!
//! The device signs the wallet transfer cell rebuilt from these fields,
//! which [Transfer::prepare] reconstructs for verification.

use ledger_ton_cell::{Address, Cell, CellBuilder, StateInit};
use log::debug;

use crate::{
    chunks,
    fields::{write_address, write_cell_ref, write_u32, write_u8, write_varuint},
    flags::Chain,
    payload::{EncodedPayload, TonPayload},
    ApduError,
};

/// Default wallet v4 subwallet id (basechain)
pub const DEFAULT_SUBWALLET_ID: u32 = 698_983_191;

bitflags::bitflags! {
    /// Outbound message send mode
    #[derive(Default)]
    pub struct SendMode: u8 {
        /// Pay forwarding fees separately from the message value
        const PAY_GAS_SEPARATELY = 1;
        /// Ignore errors during the action phase
        const IGNORE_ERRORS = 2;
        /// Destroy the wallet if its balance reaches zero
        const DESTROY_ACCOUNT_IF_ZERO = 32;
        /// Carry remaining value of the inbound message
        const CARRY_ALL_REMAINING_INCOMING_VALUE = 64;
        /// Carry the entire remaining balance
        const CARRY_ALL_REMAINING_BALANCE = 128;
    }
}

/// Wallet contract specifiers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WalletSpecifiers {
    /// Subwallet id
    pub subwallet_id: u32,
    /// Include the simple-send operation byte (wallet v4)
    pub include_wallet_op: bool,
}

impl Default for WalletSpecifiers {
    fn default() -> Self {
        Self {
            subwallet_id: DEFAULT_SUBWALLET_ID,
            include_wallet_op: true,
        }
    }
}

/// Transfer from a wallet contract
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    /// Destination address
    pub to: Address,
    /// Message send mode
    pub send_mode: SendMode,
    /// Wallet sequence number
    pub seqno: u32,
    /// Expiry (unix seconds)
    pub timeout: u32,
    /// Bounce on failure
    pub bounce: bool,
    /// Amount in nanotons
    pub amount: u128,
    /// Optional contract deployment
    pub state_init: Option<StateInit>,
    /// Optional message payload
    pub payload: Option<TonPayload>,
    /// Wallet specifiers, wallet v4 defaults when unset
    pub wallet: Option<WalletSpecifiers>,
}

/// Encoded transfer request with the expected signing cell
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedTransfer {
    /// Request buffer sent to the device
    pub request: Vec<u8>,
    /// Encoded state-init cell
    pub state_init: Option<Cell>,
    /// Encoded payload
    pub payload: Option<EncodedPayload>,
    /// Wallet transfer cell the device is expected to sign
    pub signing_cell: Cell,
}

impl PreparedTransfer {
    /// Request split into transport chunks
    pub fn chunks(&self) -> Vec<&[u8]> {
        chunks(&self.request)
    }
}

impl Transfer {
    /// Validate and encode the transfer
    pub fn prepare(&self) -> Result<PreparedTransfer, ApduError> {
        Chain::from_id(self.to.workchain as i32)?;

        let state_init = self.state_init.as_ref().map(|s| s.to_cell()).transpose()?;
        let payload = self.payload.as_ref().map(|p| p.encode()).transpose()?;

        let request = self.request(state_init.as_ref(), payload.as_ref())?;
        let signing_cell = self.signing_cell(state_init.as_ref(), payload.as_ref())?;

        debug!(
            "Prepared transfer (seqno: {}, request: {} bytes, payload: {:?})",
            self.seqno,
            request.len(),
            self.payload.as_ref().map(|p| p.kind()),
        );

        Ok(PreparedTransfer {
            request,
            state_init,
            payload,
            signing_cell,
        })
    }

    fn request(
        &self,
        state_init: Option<&Cell>,
        payload: Option<&EncodedPayload>,
    ) -> Result<Vec<u8>, ApduError> {
        let mut b = vec![];

        match &self.wallet {
            Some(w) => {
                b.extend_from_slice(&write_u8(1));
                b.extend_from_slice(&write_u32(w.subwallet_id));
                b.extend_from_slice(&write_u8(w.include_wallet_op as u8));
            }
            None => b.extend_from_slice(&write_u8(0)),
        }

        b.extend_from_slice(&write_u32(self.seqno));
        b.extend_from_slice(&write_u32(self.timeout));
        b.extend_from_slice(&write_varuint(self.amount));
        b.extend_from_slice(&write_address(&self.to)?);
        b.extend_from_slice(&write_u8(self.bounce as u8));
        b.extend_from_slice(&write_u8(self.send_mode.bits()));

        match state_init {
            Some(s) => {
                b.push(1);
                b.extend_from_slice(&write_cell_ref(s));
            }
            None => b.push(0),
        }

        match payload {
            Some(p) => {
                b.push(1);
                b.extend_from_slice(&write_cell_ref(&p.cell));
                b.extend_from_slice(&p.hints);
            }
            None => b.push(0),
        }

        Ok(b)
    }

    /// Internal message carried by the transfer
    fn order_cell(
        &self,
        state_init: Option<&Cell>,
        payload: Option<&EncodedPayload>,
    ) -> Result<Cell, ApduError> {
        let mut b = CellBuilder::new();

        // int_msg_info$0, ihr_disabled, bounce, bounced
        b.store_bit(false)?;
        b.store_bit(true)?;
        b.store_bit(self.bounce)?;
        b.store_bit(false)?;

        b.store_address(None)?;
        b.store_address(Some(&self.to))?;
        b.store_coins(self.amount)?;

        // No extra currencies, zero ihr / forward fees, created_lt, created_at
        b.store_bit(false)?;
        b.store_coins(0)?;
        b.store_coins(0)?;
        b.store_uint(0, 64)?;
        b.store_uint(0, 32)?;

        match state_init {
            Some(s) => {
                b.store_bit(true)?;
                b.store_bit(true)?;
                b.store_ref(s.clone())?;
            }
            None => {
                b.store_bit(false)?;
            }
        }

        match payload {
            Some(p) => {
                b.store_bit(true)?;
                b.store_ref(p.cell.clone())?;
            }
            None => {
                b.store_bit(false)?;
            }
        }

        Ok(b.build()?)
    }

    /// Wallet transfer cell covered by the device signature
    fn signing_cell(
        &self,
        state_init: Option<&Cell>,
        payload: Option<&EncodedPayload>,
    ) -> Result<Cell, ApduError> {
        let w = self.wallet.unwrap_or_default();
        let order = self.order_cell(state_init, payload)?;

        let mut b = CellBuilder::new();
        b.store_uint(w.subwallet_id as u128, 32)?;
        b.store_uint(self.timeout as u128, 32)?;
        b.store_uint(self.seqno as u128, 32)?;
        if w.include_wallet_op {
            b.store_uint(0, 8)?;
        }
        b.store_uint(self.send_mode.bits() as u128, 8)?;
        b.store_ref(order)?;

        Ok(b.build()?)
    }
}
