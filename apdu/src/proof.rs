// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address ownership proof APDU

use encdec::Encode;

use crate::{path::DerivationPath, ApduError, ApduStatic, Instruction, TON_APDU_CLA};

/// `P1` for proof requests
const PROOF_P1: u8 = 0x01;

/// Address proof request APDU
///
/// The device signs a proof binding the wallet address to the provided
/// domain, timestamp and payload.
///
/// ## Encoding
///
/// ```text
/// +-----------+------------------------+------------------+-------------+
/// | FLAGS (1) | PATH (1 + 4 * COUNT)   | DOMAIN_LEN (1)   | DOMAIN ...  |
/// +-----------+------------------------+------------------+-------------+
/// | TIMESTAMP (8, BE)  | PAYLOAD (remainder)                             |
/// +--------------------+-------------------------------------------------+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ProofReq {
    /// Address flags, see [crate::flags::AddressOptions::flags]
    pub flags: u8,
    /// Derivation path
    pub path: DerivationPath,
    /// Requesting application domain
    pub domain: String,
    /// Proof timestamp (unix seconds)
    pub timestamp: u64,
    /// Application challenge
    pub payload: Vec<u8>,
}

impl ApduStatic for ProofReq {
    const CLA: u8 = TON_APDU_CLA;
    const INS: u8 = Instruction::GetProof as u8;

    fn p1(&self) -> u8 {
        PROOF_P1
    }
}

impl Encode for ProofReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.path.encode_len()? + 1 + self.domain.len() + 8 + self.payload.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let domain_len =
            u8::try_from(self.domain.len()).map_err(|_| ApduError::InvalidDomain(self.domain.clone()))?;
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = self.flags;
        index += 1;

        index += self.path.encode(&mut buff[index..])?;

        buff[index] = domain_len;
        index += 1;
        buff[index..][..self.domain.len()].copy_from_slice(self.domain.as_bytes());
        index += self.domain.len();

        buff[index..][..8].copy_from_slice(&self.timestamp.to_be_bytes());
        index += 8;

        buff[index..][..self.payload.len()].copy_from_slice(&self.payload);
        index += self.payload.len();

        Ok(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ApduReq;

    #[test]
    fn proof_req_apdu() {
        let path = DerivationPath::wallet(0, 0).unwrap();
        let r = ProofReq {
            flags: 0x01,
            path: path.clone(),
            domain: "example.com".to_string(),
            timestamp: 1_700_000_000,
            payload: b"challenge".to_vec(),
        };

        let c = r.command().unwrap();
        assert_eq!((c.cla, c.ins, c.p1, c.p2), (0xe0, 0x08, 0x01, 0x00));

        let p = path.to_bytes();
        let d = &c.data;
        assert_eq!(d[0], 0x01);
        assert_eq!(&d[1..][..p.len()], &p[..]);

        let d = &d[1 + p.len()..];
        assert_eq!(d[0], 11);
        assert_eq!(&d[1..12], b"example.com");
        assert_eq!(&d[12..20], &1_700_000_000u64.to_be_bytes());
        assert_eq!(&d[20..], b"challenge");
    }

    #[test]
    fn oversized_proof_rejected() {
        let r = ProofReq {
            flags: 0,
            path: DerivationPath::wallet(0, 0).unwrap(),
            domain: "example.com".to_string(),
            timestamp: 0,
            payload: vec![0u8; 250],
        };

        assert_eq!(r.command().unwrap_err(), ApduError::InvalidLength);
    }
}
