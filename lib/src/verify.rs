// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Verification of device signing responses

use std::fmt::{Debug, Display};

use ed25519_dalek::{Signature, VerifyingKey};
use log::warn;

use ledger_ton_apdu::response::SignatureResp;
use ledger_ton_cell::{Cell, CellBuilder, CellError};

use crate::Error;

/// Check the device signed the expected hash with the expected key
///
/// The hash is compared before the signature is checked, so a desynchronised
/// request always reports [Error::HashMismatch].
pub fn verify_signed_hash<E: Display + Debug>(
    expected: &[u8; 32],
    resp: &SignatureResp,
    key: &VerifyingKey,
) -> Result<(), Error<E>> {
    check_hash(expected, resp)?;

    verify_signature(&resp.hash, &resp.signature, key)
}

/// Check a sign-data response
///
/// The device reports the payload cell hash, while the signature covers the
/// safe-sign envelope hash derived from it.
pub fn verify_signed_data<E: Display + Debug>(
    cell_hash: &[u8; 32],
    envelope_hash: &[u8; 32],
    resp: &SignatureResp,
    key: &VerifyingKey,
) -> Result<(), Error<E>> {
    check_hash(cell_hash, resp)?;

    verify_signature(envelope_hash, &resp.signature, key)
}

fn check_hash<E: Display + Debug>(
    expected: &[u8; 32],
    resp: &SignatureResp,
) -> Result<(), Error<E>> {
    if &resp.hash != expected {
        warn!(
            "Signed hash mismatch (expected: {}, actual: {})",
            hex::encode(expected),
            hex::encode(resp.hash)
        );

        return Err(Error::HashMismatch {
            expected: *expected,
            actual: resp.hash,
        });
    }

    Ok(())
}

/// Verify an ed25519 signature over a hash
pub fn verify_signature<E: Display + Debug>(
    hash: &[u8; 32],
    signature: &[u8; 64],
    key: &VerifyingKey,
) -> Result<(), Error<E>> {
    let s = Signature::from_bytes(signature);

    key.verify_strict(hash, &s).map_err(|_| {
        warn!("Signature verification failed for key {}", hex::encode(key.as_bytes()));
        Error::InvalidSignature
    })
}

/// Build the signed message cell, signature followed by the signing cell
pub fn signed_message(signature: &[u8; 64], cell: &Cell) -> Result<Cell, CellError> {
    let mut b = CellBuilder::new();

    b.store_bytes(signature)?;
    b.store_cell(cell)?;

    b.build()
}
