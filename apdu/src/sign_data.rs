// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Structured data signing requests
//!
//! ## Request encoding
//!
//! ```text
//! +------------+---------------+------------------+
//! | SCHEMA (4) | TIMESTAMP (8) | DATA (remainder) |
//! +------------+---------------+------------------+
//! ```
//!
//! The device signs
//! `sha256(0xffff ++ "ton-safe-sign-magic" ++ SCHEMA ++ TIMESTAMP ++ cell_hash)`
//! where `cell_hash` is the representation hash of the request cell.

use ledger_ton_cell::{Address, Cell, CellBuilder, TreeNode};
use log::trace;
use sha2::{Digest, Sha256};

use crate::{
    fields::write_u32,
    payload::{check_ascii, PayloadWriter},
    ApduError,
};

/// Plain text schema identifier
pub const SCHEMA_PLAINTEXT: u32 = 0x754b_f91b;

/// Application data schema identifier
pub const SCHEMA_APP_DATA: u32 = 0x54b5_8535;

/// Prefix for signed data hashes
pub const SIGN_DATA_PREFIX: &[u8] = b"ton-safe-sign-magic";

/// Maximum domain length, the hint carries a single length byte
pub const MAX_DOMAIN_LEN: usize = 255;

/// Data signing request
#[derive(Clone, Debug, PartialEq)]
pub enum SignDataRequest {
    /// Human-readable text
    Plaintext { text: String },
    /// Application data bound to an address and / or domain
    AppData(AppData),
}

/// Application data request, at least one of `address` or `domain` is required
#[derive(Clone, Debug, PartialEq)]
pub struct AppData {
    pub address: Option<Address>,
    pub domain: Option<String>,
    pub data: Cell,
    pub ext: Option<Cell>,
}

/// Encoded sign-data request body and cell
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedSignData {
    pub schema: u32,
    pub data: Vec<u8>,
    pub cell: Cell,
}

impl SignDataRequest {
    /// Create a plaintext request
    pub fn plaintext(text: impl Into<String>) -> Self {
        Self::Plaintext { text: text.into() }
    }

    /// Schema identifier for this request
    pub fn schema(&self) -> u32 {
        match self {
            SignDataRequest::Plaintext { .. } => SCHEMA_PLAINTEXT,
            SignDataRequest::AppData(_) => SCHEMA_APP_DATA,
        }
    }

    /// Encode request data and cell
    pub fn encode(&self) -> Result<EncodedSignData, ApduError> {
        let schema = self.schema();

        match self {
            SignDataRequest::Plaintext { text } => {
                check_ascii(text)?;

                let mut b = CellBuilder::new();
                b.store_string_tail(text)?;

                Ok(EncodedSignData {
                    schema,
                    data: text.as_bytes().to_vec(),
                    cell: b.build()?,
                })
            }
            SignDataRequest::AppData(a) => {
                if a.address.is_none() && a.domain.is_none() {
                    return Err(ApduError::MissingAppDataTarget);
                }

                let domain = match &a.domain {
                    Some(d) => Some((d.as_str(), domain_cell(d)?)),
                    None => None,
                };

                let mut w = PayloadWriter::empty();
                w.maybe_address(a.address.as_ref())?;
                w.maybe_bytes_ref(domain.as_ref().map(|(d, c)| (d.as_bytes(), c)))?;
                w.cell_ref(&a.data)?;
                w.maybe_ref(a.ext.as_ref())?;

                let (cell, data) = w.build()?;

                Ok(EncodedSignData { schema, data, cell })
            }
        }
    }
}

impl EncodedSignData {
    /// Build the request buffer for the provided timestamp
    pub fn request(&self, timestamp: u64) -> Vec<u8> {
        let mut b = Vec::with_capacity(12 + self.data.len());
        b.extend_from_slice(&write_u32(self.schema));
        b.extend_from_slice(&timestamp.to_be_bytes());
        b.extend_from_slice(&self.data);
        b
    }

    /// Compute the hash the device is expected to sign
    pub fn hash(&self, timestamp: u64) -> [u8; 32] {
        trace!("sign-data envelope (schema: {:08x}, timestamp: {})", self.schema, timestamp);

        sign_data_hash(self.schema, timestamp, &self.cell.hash())
    }
}

/// Compute a sign-data hash from schema, timestamp and cell hash
pub fn sign_data_hash(schema: u32, timestamp: u64, cell_hash: &[u8; 32]) -> [u8; 32] {
    let mut h = Sha256::new();

    h.update([0xff, 0xff]);
    h.update(SIGN_DATA_PREFIX);
    h.update(write_u32(schema));
    h.update(timestamp.to_be_bytes());
    h.update(cell_hash);

    h.finalize().into()
}

/// Build the domain cell, labels reversed with each followed by a null byte
///
/// `ton.org` is stored as `org\0ton\0`.
pub fn domain_cell(domain: &str) -> Result<Cell, ApduError> {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err(ApduError::InvalidDomain(domain.to_string()));
    }
    if check_ascii(domain).is_err() || domain.split('.').any(|l| l.is_empty()) {
        return Err(ApduError::InvalidDomain(domain.to_string()));
    }

    let mut b = Vec::with_capacity(domain.len() + 1);
    for l in domain.split('.').rev() {
        b.extend_from_slice(l.as_bytes());
        b.push(0);
    }

    let mut c = CellBuilder::new();
    c.store_bytes_tail(&b)?;
    Ok(c.build()?)
}
