// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Primitive field encoders for request buffers
//!
//! ## Encodings
//!
//! ```text
//! VARUINT:   | LEN (1) | VALUE (LEN bytes, big-endian, minimal) |
//! ADDRESS:   | CHAIN (1) | HASH (32) |
//! CELL_REF:  | DEPTH (2) | HASH (32) |
//! ```
//!
//! A varuint of zero is the single byte `0x00`.

use byteorder::{BigEndian, ByteOrder};
use ledger_ton_cell::{Address, TreeNode};

use crate::ApduError;

/// Encode a u8 field
pub fn write_u8(v: u8) -> [u8; 1] {
    [v]
}

/// Encode a big-endian u16 field
pub fn write_u16(v: u16) -> [u8; 2] {
    let mut b = [0u8; 2];
    BigEndian::write_u16(&mut b, v);
    b
}

/// Encode a big-endian u32 field
pub fn write_u32(v: u32) -> [u8; 4] {
    let mut b = [0u8; 4];
    BigEndian::write_u32(&mut b, v);
    b
}

/// Encode a big-endian u64 field, rejecting values wider than 64 bits
pub fn write_u64(v: u128) -> Result<[u8; 8], ApduError> {
    let v = u64::try_from(v).map_err(|_| ApduError::IntegerOverflow)?;

    let mut b = [0u8; 8];
    BigEndian::write_u64(&mut b, v);
    Ok(b)
}

/// Encode a length-prefixed minimal big-endian unsigned integer
pub fn write_varuint(v: u128) -> Vec<u8> {
    let n = (128 - v.leading_zeros() as usize + 7) / 8;

    let mut b = Vec::with_capacity(n + 1);
    b.push(n as u8);
    b.extend_from_slice(&v.to_be_bytes()[16 - n..]);
    b
}

/// Encode a chain id byte, `0xff` for masterchain
///
/// Only the basechain (0) and masterchain (-1) are accepted.
pub fn write_chain(workchain: i32) -> Result<u8, ApduError> {
    match workchain {
        0 => Ok(0x00),
        -1 => Ok(0xff),
        _ => Err(ApduError::InvalidChain(workchain)),
    }
}

/// Encode an address as chain byte and account hash
pub fn write_address(a: &Address) -> Result<[u8; 33], ApduError> {
    let mut b = [0u8; 33];
    b[0] = write_chain(a.workchain as i32)?;
    b[1..].copy_from_slice(&a.hash);
    Ok(b)
}

/// Encode a tree reference as depth and hash
pub fn write_cell_ref(c: &impl TreeNode) -> [u8; 34] {
    let mut b = [0u8; 34];
    b[..2].copy_from_slice(&write_u16(c.depth()));
    b[2..].copy_from_slice(&c.hash());
    b
}
