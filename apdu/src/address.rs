// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address (public key) request APDU

use encdec::Encode;

use crate::{path::DerivationPath, ApduError, ApduStatic, Instruction, TON_APDU_CLA};

/// Address request APDU
///
/// Fetches the public key for a derivation path, optionally displaying
/// the resulting address on the device for confirmation (`P1 = 0x01`).
///
/// ## Encoding
///
/// ```text
/// +-----------+-----------------------------+
/// | FLAGS (1) | PATH (1 + 4 * COUNT bytes)  |
/// +-----------+-----------------------------+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct AddressReq {
    /// Address flags, see [crate::flags::AddressOptions::flags]
    pub flags: u8,
    /// Derivation path
    pub path: DerivationPath,
    /// Display address for user confirmation
    pub confirm: bool,
}

impl AddressReq {
    /// Create a new address request
    pub fn new(path: DerivationPath, flags: u8, confirm: bool) -> Self {
        Self {
            flags,
            path,
            confirm,
        }
    }
}

impl ApduStatic for AddressReq {
    const CLA: u8 = TON_APDU_CLA;
    const INS: u8 = Instruction::GetAddress as u8;

    fn p1(&self) -> u8 {
        self.confirm as u8
    }
}

impl Encode for AddressReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.path.encode_len()?)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.flags;
        let n = self.path.encode(&mut buff[1..])?;

        Ok(1 + n)
    }
}
