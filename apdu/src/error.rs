// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_ton_cell::CellError;

/// Request encoding and response decoding errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApduError {
    /// Derivation path is malformed or outside the TON hierarchy
    #[error("Invalid derivation path")]
    InvalidPath,

    /// Chain id is not supported
    #[error("Invalid chain id: {0}")]
    InvalidChain(i32),

    /// Payload type is not known
    #[error("Unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    /// Integer does not fit the target field
    #[error("Integer overflow")]
    IntegerOverflow,

    /// Buffer or field length invalid
    #[error("Invalid length")]
    InvalidLength,

    /// Invalid field encoding
    #[error("Invalid encoding")]
    InvalidEncoding,

    /// Invalid UTF-8 in string field
    #[error("Invalid UTF-8")]
    InvalidUtf8,

    /// Text contains characters outside printable ASCII
    #[error("Text must be printable ASCII")]
    NonAsciiText,

    /// Domain name malformed
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// App-data request without address or domain
    #[error("App data requires an address or domain")]
    MissingAppDataTarget,

    /// Cell construction failed
    #[error("Cell error: {0}")]
    Cell(#[from] CellError),
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => Self::InvalidLength,
            _ => Self::InvalidEncoding,
        }
    }
}
