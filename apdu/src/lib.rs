// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for TON app communication
//!
//! This module provides the host-side encoders for requests to the TON
//! ledger application, and decoders for the matching device responses.
//!
//! Requests are either single APDUs (app info, version, address, proof)
//! or chunked transfers (transactions, sign-data), where the derivation
//! path is declared first then the request body is streamed in chunks
//! of at most [CHUNK_SIZE] bytes.
//!
//! Multi-byte integer fields are big-endian throughout.

use encdec::Encode;
use ledger_apdu::APDUCommand;
use log::trace;

pub use ledger_ton_cell as cell;

mod error;
pub use error::ApduError;

pub mod address;
pub mod app_info;
pub mod fields;
pub mod flags;
pub mod path;
pub mod payload;
pub mod prelude;
pub mod proof;
pub mod response;
pub mod sign_data;
pub mod transfer;
pub mod wallet;

/// TON application APDU class
pub const TON_APDU_CLA: u8 = 0xe0;

/// Dashboard / application info APDU class
pub const APP_INFO_CLA: u8 = 0xb0;

/// Maximum data length for a single chunk of a chunked transfer
pub const CHUNK_SIZE: usize = 255;

/// TON APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch running application name and version (class `0xb0`)
    GetAppInfo = 0x01,

    /// Fetch TON application version
    GetVersion = 0x03,

    /// Fetch the public key for a derivation path
    GetAddress = 0x05,

    /// Sign a transfer request
    SignTx = 0x06,

    /// Sign an address ownership proof
    GetProof = 0x08,

    /// Sign a structured data request
    SignData = 0x09,
}

/// Chunked transfer stage, carried in `P2`
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum ChunkP2 {
    /// Final chunk, device responds with the result
    Final = 0x00,
    /// Intermediate chunk, more to follow
    More = 0x02,
    /// Derivation path declaration, opens the transfer
    Start = 0x03,
}

/// Single-shot (legacy firmware) signing stage, carried in `P1`
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum LegacyP1 {
    /// Declare derivation path
    Path = 0x00,
    /// Complete request body
    Payload = 0x01,
}

/// Static APDU header information for request types
pub trait ApduStatic {
    /// APDU class
    const CLA: u8;

    /// APDU instruction
    const INS: u8;

    /// APDU `P1`, defaults to zero
    fn p1(&self) -> u8 {
        0
    }

    /// APDU `P2`, defaults to zero
    fn p2(&self) -> u8 {
        0
    }
}

/// Request objects that can be converted to APDU commands
pub trait ApduReq {
    /// Encode the request into an [APDUCommand]
    fn command(&self) -> Result<APDUCommand<Vec<u8>>, ApduError>;
}

impl<T: ApduStatic + Encode<Error = ApduError>> ApduReq for T {
    fn command(&self) -> Result<APDUCommand<Vec<u8>>, ApduError> {
        let n = self.encode_len()?;
        if n > CHUNK_SIZE {
            return Err(ApduError::InvalidLength);
        }

        let mut data = vec![0u8; n];
        self.encode(&mut data)?;

        Ok(APDUCommand {
            cla: Self::CLA,
            ins: Self::INS,
            p1: self.p1(),
            p2: self.p2(),
            data,
        })
    }
}

/// Build a raw [APDUCommand] for the TON application class
pub fn raw_command(ins: Instruction, p1: u8, p2: u8, data: &[u8]) -> APDUCommand<Vec<u8>> {
    APDUCommand {
        cla: TON_APDU_CLA,
        ins: ins as u8,
        p1,
        p2,
        data: data.to_vec(),
    }
}

/// Split a request body into [CHUNK_SIZE] chunks
///
/// An empty body produces a single empty chunk so a transfer always
/// carries a final stage.
pub fn chunks(buff: &[u8]) -> Vec<&[u8]> {
    let c: Vec<_> = match buff.is_empty() {
        true => vec![buff],
        false => buff.chunks(CHUNK_SIZE).collect(),
    };

    trace!("split {} bytes into {} chunks", buff.len(), c.len());

    c
}
