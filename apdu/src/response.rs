// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing and public key responses

use encdec::{DecodeOwned, Encode};

use crate::ApduError;

/// Signature response APDU, returned on completion of signing operations
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    SIG_LEN    |                                               |
/// +-+-+-+-+-+-+-+-+                                               /
/// /                    SIGNATURE (64-byte ed25519)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   HASH_LEN    |                                               |
/// +-+-+-+-+-+-+-+-+                                               /
/// /                   HASH (32-byte signed hash)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Length bytes are not checked, fields are read from fixed offsets.
#[derive(Clone, PartialEq, Debug)]
pub struct SignatureResp {
    /// Ed25519 signature over `hash`
    pub signature: [u8; 64],
    /// Hash signed by the device
    pub hash: [u8; 32],
}

const SIGNATURE_OFFSET: usize = 1;
const HASH_OFFSET: usize = 66;
const SIGNATURE_RESP_LEN: usize = HASH_OFFSET + 32;

impl SignatureResp {
    /// Create a new signature response
    pub fn new(signature: [u8; 64], hash: [u8; 32]) -> Self {
        Self { signature, hash }
    }
}

impl Encode for SignatureResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(SIGNATURE_RESP_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < SIGNATURE_RESP_LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = 64;
        buff[SIGNATURE_OFFSET..][..64].copy_from_slice(&self.signature);
        buff[HASH_OFFSET - 1] = 32;
        buff[HASH_OFFSET..][..32].copy_from_slice(&self.hash);

        Ok(SIGNATURE_RESP_LEN)
    }
}

impl DecodeOwned for SignatureResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < SIGNATURE_RESP_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut signature = [0u8; 64];
        signature.copy_from_slice(&buff[SIGNATURE_OFFSET..][..64]);

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&buff[HASH_OFFSET..][..32]);

        Ok((Self { signature, hash }, SIGNATURE_RESP_LEN))
    }
}

/// Public key response APDU, exactly 32 bytes
#[derive(Clone, PartialEq, Debug)]
pub struct AddressResp {
    /// Ed25519 public key
    pub public_key: [u8; 32],
}

impl Encode for AddressResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(32)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < 32 {
            return Err(ApduError::InvalidLength);
        }
        buff[..32].copy_from_slice(&self.public_key);
        Ok(32)
    }
}

impl DecodeOwned for AddressResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let public_key = <[u8; 32]>::try_from(buff).map_err(|_| ApduError::InvalidLength)?;
        Ok((Self { public_key }, 32))
    }
}
