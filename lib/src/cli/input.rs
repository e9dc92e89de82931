// Copyright (c) 2022-2023 The MobileCoin Foundation

//! JSON transfer input and signed output documents

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use ledger_ton::{
    apdu::{
        payload::{
            JettonBurn, JettonTransfer, NftTransfer, PayloadKind, SingleNominatorWithdraw,
            TonPayload,
        },
        transfer::{SendMode, Transfer, WalletSpecifiers},
    },
    cell::{Address, Cell, StateInit},
    transport::TransportError,
    Error,
};

use crate::helpers::parse_boc;

/// Transfer request document
///
/// Amounts are decimal strings (nanotons), cells are base64 BoC strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferInput {
    pub to: String,
    pub amount: String,
    pub seqno: u32,
    pub timeout: u32,
    #[serde(default = "default_bounce")]
    pub bounce: bool,
    #[serde(default = "default_send_mode")]
    pub send_mode: u8,
    #[serde(default)]
    pub state_init: Option<StateInitInput>,
    #[serde(default)]
    pub payload: Option<PayloadInput>,
    #[serde(default)]
    pub wallet: Option<WalletInput>,
}

fn default_bounce() -> bool {
    true
}

fn default_send_mode() -> u8 {
    (SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS).bits()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateInitInput {
    pub code: String,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletInput {
    pub subwallet_id: u32,
    #[serde(default = "default_bounce")]
    pub include_wallet_op: bool,
}

/// Tagged payload document, `type` selects the payload kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadInput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub query_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub new_owner: Option<String>,
    #[serde(default)]
    pub response_destination: Option<String>,
    #[serde(default)]
    pub custom_payload: Option<String>,
    #[serde(default)]
    pub forward_amount: Option<String>,
    #[serde(default)]
    pub forward_payload: Option<String>,
}

/// Signed transfer output document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedOutput {
    /// Signed message body (base64 BoC)
    pub boc: String,
    /// Hash of the signed message body (hex)
    pub hash: String,
}

fn parse_amount(s: &str) -> anyhow::Result<u128> {
    s.trim()
        .parse()
        .with_context(|| format!("invalid amount '{s}'"))
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    s.parse()
        .map_err(|e| anyhow!("invalid address '{}': {}", s, e))
}

fn parse_cell(s: &Option<String>) -> anyhow::Result<Option<Cell>> {
    s.as_deref().map(parse_boc).transpose()
}

impl TransferInput {
    /// Convert to a [Transfer]
    pub fn to_transfer(&self) -> anyhow::Result<Transfer> {
        let state_init = match &self.state_init {
            Some(s) => Some(StateInit::new(parse_boc(&s.code)?, parse_boc(&s.data)?)),
            None => None,
        };

        let send_mode = SendMode::from_bits(self.send_mode)
            .ok_or_else(|| anyhow!("invalid send mode: {}", self.send_mode))?;

        Ok(Transfer {
            to: parse_address(&self.to)?,
            send_mode,
            seqno: self.seqno,
            timeout: self.timeout,
            bounce: self.bounce,
            amount: parse_amount(&self.amount)?,
            state_init,
            payload: self.payload.as_ref().map(|p| p.to_payload()).transpose()?,
            wallet: self.wallet.as_ref().map(|w| WalletSpecifiers {
                subwallet_id: w.subwallet_id,
                include_wallet_op: w.include_wallet_op,
            }),
        })
    }
}

impl PayloadInput {
    fn field<'a>(&self, name: &str, v: &'a Option<String>) -> anyhow::Result<&'a str> {
        v.as_deref()
            .ok_or_else(|| anyhow!("{} payload requires '{}'", self.kind, name))
    }

    /// Convert to a [TonPayload]
    pub fn to_payload(&self) -> anyhow::Result<TonPayload> {
        let kind = PayloadKind::parse(&self.kind).map_err(Error::<TransportError>::from)?;
        let p = match kind {
            PayloadKind::Comment => TonPayload::Comment {
                text: self.field("text", &self.text)?.to_string(),
            },
            PayloadKind::Unsafe => TonPayload::Unsafe {
                message: parse_boc(self.field("message", &self.message)?)?,
            },
            PayloadKind::JettonTransfer => TonPayload::JettonTransfer(JettonTransfer {
                query_id: self.query_id,
                amount: parse_amount(self.field("amount", &self.amount)?)?,
                destination: parse_address(self.field("destination", &self.destination)?)?,
                response_destination: parse_address(
                    self.field("response_destination", &self.response_destination)?,
                )?,
                custom_payload: parse_cell(&self.custom_payload)?,
                forward_amount: self.forward_amount()?,
                forward_payload: parse_cell(&self.forward_payload)?,
            }),
            PayloadKind::NftTransfer => TonPayload::NftTransfer(NftTransfer {
                query_id: self.query_id,
                new_owner: parse_address(self.field("new_owner", &self.new_owner)?)?,
                response_destination: parse_address(
                    self.field("response_destination", &self.response_destination)?,
                )?,
                custom_payload: parse_cell(&self.custom_payload)?,
                forward_amount: self.forward_amount()?,
                forward_payload: parse_cell(&self.forward_payload)?,
            }),
            PayloadKind::JettonBurn => TonPayload::JettonBurn(JettonBurn {
                query_id: self.query_id,
                amount: parse_amount(self.field("amount", &self.amount)?)?,
                response_destination: parse_address(
                    self.field("response_destination", &self.response_destination)?,
                )?,
                custom_payload: parse_cell(&self.custom_payload)?,
            }),
            PayloadKind::SingleNominatorWithdraw => {
                TonPayload::SingleNominatorWithdraw(SingleNominatorWithdraw {
                    query_id: self.query_id,
                    amount: parse_amount(self.field("amount", &self.amount)?)?,
                })
            }
        };

        Ok(p)
    }

    fn forward_amount(&self) -> anyhow::Result<u128> {
        match &self.forward_amount {
            Some(v) => parse_amount(v),
            None => Ok(0),
        }
    }
}
