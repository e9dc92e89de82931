// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transfer payloads and display hints
//!
//! Each payload is encoded twice: as the cell the wallet contract will
//! forward on-chain, and as a flattened hint stream the device parses to
//! display the payload to the user.
//!
//! ## Hint encoding
//!
//! ```text
//! UNSAFE (no hints):
//! +----------+
//! | 0x00 (1) |
//! +----------+
//!
//! TYPED:
//! +----------+--------------+---------+---------------+
//! | 0x01 (1) | SUBTYPE (4)  | LEN (2) | FIELDS (LEN)  |
//! +----------+--------------+---------+---------------+
//! ```
//!
//! Optional fields carry a presence byte in the hint stream and a
//! presence bit in the cell, with the value following only when present.
//! Cell references are flattened as depth and hash.

use core::str::FromStr;

use log::trace;

use ledger_ton_cell::{Address, Cell, CellBuilder};

use crate::{
    fields::{write_address, write_cell_ref, write_u16, write_u32, write_u64, write_varuint},
    ApduError,
};

/// Jetton transfer operation code
pub const OP_JETTON_TRANSFER: u32 = 0x0f8a_7ea5;

/// NFT transfer operation code
pub const OP_NFT_TRANSFER: u32 = 0x5fcc_3d14;

/// Jetton burn operation code
pub const OP_JETTON_BURN: u32 = 0x595f_07bc;

/// Single-nominator pool withdraw operation code
pub const OP_SINGLE_NOMINATOR_WITHDRAW: u32 = 0x1000;

/// Maximum comment length, the comment must fit in the payload cell
pub const MAX_COMMENT_LEN: usize = 123;

/// Display hint subtypes
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u32)]
pub enum HintType {
    Comment = 0x00,
    JettonTransfer = 0x01,
    NftTransfer = 0x02,
    JettonBurn = 0x03,
    SingleNominatorWithdraw = 0x05,
}

/// Payload kind tags, used to select variants from tagged inputs
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PayloadKind {
    Comment,
    Unsafe,
    JettonTransfer,
    NftTransfer,
    JettonBurn,
    SingleNominatorWithdraw,
}

impl PayloadKind {
    /// Parse a payload tag, failing with [ApduError::UnsupportedPayloadType]
    pub fn parse(s: &str) -> Result<Self, ApduError> {
        Self::from_str(s).map_err(|_| ApduError::UnsupportedPayloadType(s.to_string()))
    }
}

/// Transfer payload
#[derive(Clone, Debug, PartialEq)]
pub enum TonPayload {
    /// Plain text comment
    Comment { text: String },
    /// Opaque caller-provided message cell, displayed without decoding
    Unsafe { message: Cell },
    JettonTransfer(JettonTransfer),
    NftTransfer(NftTransfer),
    JettonBurn(JettonBurn),
    SingleNominatorWithdraw(SingleNominatorWithdraw),
}

/// Jetton (token) transfer
#[derive(Clone, Debug, PartialEq)]
pub struct JettonTransfer {
    pub query_id: Option<u64>,
    pub amount: u128,
    pub destination: Address,
    pub response_destination: Address,
    pub custom_payload: Option<Cell>,
    pub forward_amount: u128,
    pub forward_payload: Option<Cell>,
}

/// NFT ownership transfer
#[derive(Clone, Debug, PartialEq)]
pub struct NftTransfer {
    pub query_id: Option<u64>,
    pub new_owner: Address,
    pub response_destination: Address,
    pub custom_payload: Option<Cell>,
    pub forward_amount: u128,
    pub forward_payload: Option<Cell>,
}

/// Jetton burn
#[derive(Clone, Debug, PartialEq)]
pub struct JettonBurn {
    pub query_id: Option<u64>,
    pub amount: u128,
    pub response_destination: Address,
    pub custom_payload: Option<Cell>,
}

/// Withdraw from a single-nominator staking pool
#[derive(Clone, Debug, PartialEq)]
pub struct SingleNominatorWithdraw {
    pub query_id: Option<u64>,
    pub amount: u128,
}

/// Encoded payload cell and matching hint bytes
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedPayload {
    pub cell: Cell,
    pub hints: Vec<u8>,
}

impl TonPayload {
    /// Fetch the kind tag for this payload
    pub fn kind(&self) -> PayloadKind {
        match self {
            TonPayload::Comment { .. } => PayloadKind::Comment,
            TonPayload::Unsafe { .. } => PayloadKind::Unsafe,
            TonPayload::JettonTransfer(_) => PayloadKind::JettonTransfer,
            TonPayload::NftTransfer(_) => PayloadKind::NftTransfer,
            TonPayload::JettonBurn(_) => PayloadKind::JettonBurn,
            TonPayload::SingleNominatorWithdraw(_) => PayloadKind::SingleNominatorWithdraw,
        }
    }

    /// Encode payload cell and hints
    pub fn encode(&self) -> Result<EncodedPayload, ApduError> {
        match self {
            TonPayload::Comment { text } => encode_comment(text),
            TonPayload::Unsafe { message } => Ok(EncodedPayload {
                cell: message.clone(),
                hints: vec![0x00],
            }),
            TonPayload::JettonTransfer(t) => {
                let mut w = PayloadWriter::new(OP_JETTON_TRANSFER)?;
                w.query_id(t.query_id)?;
                w.coins(t.amount)?;
                w.address(&t.destination)?;
                w.address(&t.response_destination)?;
                w.maybe_ref(t.custom_payload.as_ref())?;
                w.coins(t.forward_amount)?;
                w.maybe_ref(t.forward_payload.as_ref())?;
                w.finish(HintType::JettonTransfer)
            }
            TonPayload::NftTransfer(t) => {
                let mut w = PayloadWriter::new(OP_NFT_TRANSFER)?;
                w.query_id(t.query_id)?;
                w.address(&t.new_owner)?;
                w.address(&t.response_destination)?;
                w.maybe_ref(t.custom_payload.as_ref())?;
                w.coins(t.forward_amount)?;
                w.maybe_ref(t.forward_payload.as_ref())?;
                w.finish(HintType::NftTransfer)
            }
            TonPayload::JettonBurn(t) => {
                let mut w = PayloadWriter::new(OP_JETTON_BURN)?;
                w.query_id(t.query_id)?;
                w.coins(t.amount)?;
                w.address(&t.response_destination)?;
                w.maybe_ref(t.custom_payload.as_ref())?;
                w.finish(HintType::JettonBurn)
            }
            TonPayload::SingleNominatorWithdraw(t) => {
                let mut w = PayloadWriter::new(OP_SINGLE_NOMINATOR_WITHDRAW)?;
                w.query_id(t.query_id)?;
                w.coins(t.amount)?;
                w.finish(HintType::SingleNominatorWithdraw)
            }
        }
    }
}

/// Check text is printable ASCII
pub(crate) fn check_ascii(text: &str) -> Result<(), ApduError> {
    match text.bytes().all(|c| (0x20..0x7f).contains(&c)) {
        true => Ok(()),
        false => Err(ApduError::NonAsciiText),
    }
}

fn encode_comment(text: &str) -> Result<EncodedPayload, ApduError> {
    check_ascii(text)?;
    if text.len() > MAX_COMMENT_LEN {
        return Err(ApduError::InvalidLength);
    }

    let mut b = CellBuilder::new();
    b.store_uint(0, 32)?;
    b.store_bytes(text.as_bytes())?;

    let mut hints = vec![0x01];
    hints.extend_from_slice(&write_u32(HintType::Comment as u32));
    hints.extend_from_slice(&write_u16(text.len() as u16));
    hints.extend_from_slice(text.as_bytes());

    trace!("comment hints: {} bytes", hints.len());

    Ok(EncodedPayload {
        cell: b.build()?,
        hints,
    })
}

/// Writes cell fields and their hint flattening in lockstep, so field
/// presence cannot differ between the two streams.
#[derive(Debug)]
pub(crate) struct PayloadWriter {
    cell: CellBuilder,
    hints: Vec<u8>,
}

impl PayloadWriter {
    /// Start a payload with the provided operation code
    pub fn new(op: u32) -> Result<Self, ApduError> {
        let mut cell = CellBuilder::new();
        cell.store_uint(op as u128, 32)?;

        Ok(Self {
            cell,
            hints: vec![],
        })
    }

    /// Start a payload with no operation code
    pub fn empty() -> Self {
        Self {
            cell: CellBuilder::new(),
            hints: vec![],
        }
    }

    /// Optional query id, zero in the cell when absent
    pub fn query_id(&mut self, v: Option<u64>) -> Result<(), ApduError> {
        match v {
            Some(v) => {
                self.hints.push(1);
                self.hints.extend_from_slice(&write_u64(v as u128)?);
                self.cell.store_uint(v as u128, 64)?;
            }
            None => {
                self.hints.push(0);
                self.cell.store_uint(0, 64)?;
            }
        }
        Ok(())
    }

    /// Coin amount
    pub fn coins(&mut self, v: u128) -> Result<(), ApduError> {
        self.cell.store_coins(v)?;
        self.hints.extend_from_slice(&write_varuint(v));
        Ok(())
    }

    /// Mandatory address
    pub fn address(&mut self, a: &Address) -> Result<(), ApduError> {
        self.hints.extend_from_slice(&write_address(a)?);
        self.cell.store_address(Some(a))?;
        Ok(())
    }

    /// Optional address, presence bit then address in the cell
    pub fn maybe_address(&mut self, a: Option<&Address>) -> Result<(), ApduError> {
        match a {
            Some(a) => {
                self.hints.push(1);
                self.cell.store_bit(true)?;
                self.address(a)
            }
            None => {
                self.hints.push(0);
                self.cell.store_bit(false)?;
                Ok(())
            }
        }
    }

    /// Mandatory cell reference
    pub fn cell_ref(&mut self, c: &Cell) -> Result<(), ApduError> {
        self.cell.store_ref(c.clone())?;
        self.hints.extend_from_slice(&write_cell_ref(c));
        Ok(())
    }

    /// Optional cell reference
    pub fn maybe_ref(&mut self, c: Option<&Cell>) -> Result<(), ApduError> {
        self.cell.store_maybe_ref(c)?;
        match c {
            Some(c) => {
                self.hints.push(1);
                self.hints.extend_from_slice(&write_cell_ref(c));
            }
            None => self.hints.push(0),
        }
        Ok(())
    }

    /// Optional length-prefixed hint bytes, with a matching reference in the cell
    pub fn maybe_bytes_ref(&mut self, v: Option<(&[u8], &Cell)>) -> Result<(), ApduError> {
        match v {
            Some((b, c)) => {
                let n = u8::try_from(b.len()).map_err(|_| ApduError::InvalidLength)?;
                self.cell.store_maybe_ref(Some(c))?;
                self.hints.push(1);
                self.hints.push(n);
                self.hints.extend_from_slice(b);
            }
            None => {
                self.cell.store_bit(false)?;
                self.hints.push(0);
            }
        }
        Ok(())
    }

    /// Finish into cell and raw (untyped) hint fields
    pub fn build(self) -> Result<(Cell, Vec<u8>), ApduError> {
        Ok((self.cell.build()?, self.hints))
    }

    /// Finish into an [EncodedPayload] with typed hint header
    pub fn finish(self, kind: HintType) -> Result<EncodedPayload, ApduError> {
        let (cell, d) = self.build()?;
        let n = u16::try_from(d.len()).map_err(|_| ApduError::InvalidLength)?;

        let mut hints = Vec::with_capacity(d.len() + 7);
        hints.push(0x01);
        hints.extend_from_slice(&write_u32(kind as u32));
        hints.extend_from_slice(&write_u16(n));
        hints.extend_from_slice(&d);

        trace!("{:?} hints: {} bytes", kind, hints.len());

        Ok(EncodedPayload { cell, hints })
    }
}

#[cfg(test)]
mod test {
    use ledger_ton_cell::TreeNode;

    use super::*;

    fn addr(b: u8) -> Address {
        Address::new(0, [b; 32])
    }

    fn payloads() -> Vec<TonPayload> {
        let mut fwd = CellBuilder::new();
        fwd.store_uint(0, 32).unwrap();
        fwd.store_bytes(b"gm").unwrap();
        let fwd = fwd.build().unwrap();

        vec![
            TonPayload::Comment {
                text: "Deposit".to_string(),
            },
            TonPayload::Unsafe {
                message: fwd.clone(),
            },
            TonPayload::JettonTransfer(JettonTransfer {
                query_id: Some(7),
                amount: 1_000_000,
                destination: addr(1),
                response_destination: addr(2),
                custom_payload: None,
                forward_amount: 1,
                forward_payload: Some(fwd.clone()),
            }),
            TonPayload::NftTransfer(NftTransfer {
                query_id: None,
                new_owner: addr(3),
                response_destination: addr(4),
                custom_payload: Some(fwd.clone()),
                forward_amount: 0,
                forward_payload: None,
            }),
            TonPayload::JettonBurn(JettonBurn {
                query_id: Some(u64::MAX),
                amount: 5,
                response_destination: addr(5),
                custom_payload: None,
            }),
            TonPayload::SingleNominatorWithdraw(SingleNominatorWithdraw {
                query_id: None,
                amount: 1_000_000_000,
            }),
        ]
    }

    #[test]
    fn comment_payload() {
        let p = TonPayload::Comment {
            text: "Deposit".to_string(),
        };
        let e = p.encode().unwrap();

        let mut expected = vec![0u8; 4];
        expected.extend_from_slice(b"Deposit");
        assert_eq!(e.cell.bit_len(), 32 + 7 * 8);
        assert_eq!(e.cell.data(), &expected[..]);
        assert!(e.cell.refs().is_empty());

        let mut hints = vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07];
        hints.extend_from_slice(b"Deposit");
        assert_eq!(e.hints, hints);
    }

    #[test]
    fn comment_validation() {
        let p = TonPayload::Comment {
            text: "caf\u{e9}".to_string(),
        };
        assert_eq!(p.encode().unwrap_err(), ApduError::NonAsciiText);

        let p = TonPayload::Comment {
            text: "a".repeat(MAX_COMMENT_LEN + 1),
        };
        assert_eq!(p.encode().unwrap_err(), ApduError::InvalidLength);

        let p = TonPayload::Comment {
            text: "a".repeat(MAX_COMMENT_LEN),
        };
        assert!(p.encode().is_ok());
    }

    #[test]
    fn jetton_transfer_minimal() {
        let d = Address::new(0, [0xdd; 32]);
        let p = TonPayload::JettonTransfer(JettonTransfer {
            query_id: None,
            amount: 1,
            destination: d,
            response_destination: d,
            custom_payload: None,
            forward_amount: 0,
            forward_payload: None,
        });
        let e = p.encode().unwrap();

        // Cell: op, query id, coins(1), address, address, 0, coins(0), 0
        let mut b = CellBuilder::new();
        b.store_uint(0x0f8a7ea5, 32).unwrap();
        b.store_uint(0, 64).unwrap();
        b.store_coins(1).unwrap();
        b.store_address(Some(&d)).unwrap();
        b.store_address(Some(&d)).unwrap();
        b.store_bit(false).unwrap();
        b.store_coins(0).unwrap();
        b.store_bit(false).unwrap();
        let expected = b.build().unwrap();

        assert_eq!(e.cell, expected);
        assert_eq!(&e.cell.data()[..4], &[0x0f, 0x8a, 0x7e, 0xa5]);
        assert_eq!(e.cell.bit_len(), 32 + 64 + 12 + 267 * 2 + 1 + 4 + 1);

        // Hints: presence 0, varuint(1), D, D, presence 0, varuint(0), presence 0
        let mut d_bytes = vec![0x00];
        d_bytes.extend_from_slice(&[0xdd; 32]);

        let mut fields = vec![0x00, 0x01, 0x01];
        fields.extend_from_slice(&d_bytes);
        fields.extend_from_slice(&d_bytes);
        fields.extend_from_slice(&[0x00, 0x00, 0x00]);

        assert_eq!(&e.hints[..5], &[0x01, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&e.hints[5..7], &(fields.len() as u16).to_be_bytes());
        assert_eq!(&e.hints[7..], &fields[..]);
    }

    #[test]
    fn payload_address_chain_checked() {
        let p = TonPayload::JettonTransfer(JettonTransfer {
            query_id: None,
            amount: 1,
            destination: Address::new(5, [0xdd; 32]),
            response_destination: addr(2),
            custom_payload: None,
            forward_amount: 0,
            forward_payload: None,
        });
        assert_eq!(p.encode().unwrap_err(), ApduError::InvalidChain(5));

        let p = TonPayload::NftTransfer(NftTransfer {
            query_id: None,
            new_owner: addr(3),
            response_destination: Address::new(1, [0xee; 32]),
            custom_payload: None,
            forward_amount: 0,
            forward_payload: None,
        });
        assert_eq!(p.encode().unwrap_err(), ApduError::InvalidChain(1));
    }

    #[test]
    fn hint_length_matches_body() {
        for p in payloads() {
            let e = p.encode().unwrap();

            if p.kind() == PayloadKind::Unsafe {
                assert_eq!(e.hints, vec![0x00]);
                continue;
            }

            assert_eq!(e.hints[0], 0x01);
            let n = u16::from_be_bytes([e.hints[5], e.hints[6]]) as usize;
            assert_eq!(n, e.hints.len() - 7, "{:?}", p.kind());
        }
    }

    #[test]
    fn encoding_idempotent() {
        for p in payloads() {
            let a = p.encode().unwrap();
            let b = p.encode().unwrap();

            assert_eq!(a.cell.hash(), b.cell.hash());
            assert_eq!(a.hints, b.hints);
        }
    }

    #[test]
    fn presence_matches_between_streams() {
        let fwd = Cell::empty();
        let p = TonPayload::NftTransfer(NftTransfer {
            query_id: Some(1),
            new_owner: addr(1),
            response_destination: addr(2),
            custom_payload: None,
            forward_amount: 0,
            forward_payload: Some(fwd.clone()),
        });
        let e = p.encode().unwrap();

        // Only the forward payload is referenced
        assert_eq!(e.cell.refs().len(), 1);
        assert_eq!(e.cell.refs()[0].hash(), fwd.hash());

        // custom payload bit (after op, qid, 2 addresses) is clear
        assert_eq!(e.cell.bit(32 + 64 + 267 * 2), Some(false));
        // forward payload bit (after coins(0)) is set
        assert_eq!(e.cell.bit(32 + 64 + 267 * 2 + 1 + 4), Some(true));

        // Hint tail: presence 0, varuint(0), presence 1, depth, hash
        let tail = &e.hints[e.hints.len() - 37..];
        assert_eq!(&tail[..3], &[0x00, 0x00, 0x01]);
        assert_eq!(&tail[3..], &write_cell_ref(&fwd));
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(
            PayloadKind::parse("jetton-transfer"),
            Ok(PayloadKind::JettonTransfer)
        );
        assert_eq!(
            PayloadKind::parse("single-nominator-withdraw"),
            Ok(PayloadKind::SingleNominatorWithdraw)
        );
        assert_eq!(
            PayloadKind::parse("token-swap"),
            Err(ApduError::UnsupportedPayloadType("token-swap".to_string()))
        );

        for p in payloads() {
            assert_eq!(PayloadKind::parse(&p.kind().to_string()), Ok(p.kind()));
        }
    }
}
