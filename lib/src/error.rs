// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::Debug;
use std::fmt::Display;

use ledger_ton_apdu::ApduError;
use ledger_ton_cell::CellError;
use tokio::time::error::Elapsed;

use crate::exchange::ExchangeState;

/// Ledger TON API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error<E: Display + Debug> {
    /// HID Init Error
    #[error("could not create HidApi instance")]
    HidInit,

    /// Transport error
    #[error("Transport error {0}")]
    Transport(E),

    /// Device returned a non-success status word
    #[error("Device returned status 0x{0:04x}")]
    Status(u16),

    /// Derivation path invalid
    #[error("Invalid derivation path")]
    InvalidPath,

    /// Chain id outside basechain / masterchain
    #[error("Invalid chain: {0}")]
    InvalidChain(i32),

    /// Payload type not supported
    #[error("Unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    /// Request could not be encoded
    #[error("Encoding failed: {0}")]
    Encoding(ApduError),

    /// Malformed or short device response
    #[error("Invalid device response: {0}")]
    DeviceResponse(&'static str),

    /// Running application is not the TON app
    #[error("Unexpected application: {0}")]
    UnexpectedApp(String),

    /// Signed hash differs from the locally reconstructed hash
    #[error(
        "Hash mismatch (expected: {}, actual: {})",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    HashMismatch { expected: [u8; 32], actual: [u8; 32] },

    /// Signature failed verification
    #[error("Invalid signature")]
    InvalidSignature,

    /// Invalid key in response
    #[error("Invalid key object")]
    InvalidKey,

    /// Invalid exchange state
    #[error("Invalid exchange state (actual: {0}, expected: {1})")]
    InvalidState(ExchangeState, ExchangeState),

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,
}

impl<E: Display + Debug> From<Elapsed> for Error<E> {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

/// Lift validation errors, keeping path / chain / payload errors distinct
impl<E: Display + Debug> From<ApduError> for Error<E> {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidPath => Error::InvalidPath,
            ApduError::InvalidChain(c) => Error::InvalidChain(c),
            ApduError::UnsupportedPayloadType(t) => Error::UnsupportedPayloadType(t),
            _ => Error::Encoding(e),
        }
    }
}

impl<E: Display + Debug> From<CellError> for Error<E> {
    fn from(e: CellError) -> Self {
        Error::Encoding(ApduError::Cell(e))
    }
}
