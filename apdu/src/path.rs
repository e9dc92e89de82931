// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TON derivation paths (`m/44'/607'/...`)
//!
//! ## Encoding
//!
//! ```text
//! +-----------+-------------------------------------------+
//! | COUNT (1) | ELEMENT + 0x80000000 (4 bytes, BE) x COUNT |
//! +-----------+-------------------------------------------+
//! ```
//!
//! Elements are stored un-hardened and are hardened on encoding.

use core::{fmt::Display, str::FromStr};

use encdec::Encode;

use crate::{fields::write_u32, ApduError};

/// BIP-44 purpose element
pub const PURPOSE: u32 = 44;

/// SLIP-0044 TON coin type
pub const COIN_TYPE: u32 = 607;

/// Hardened derivation bias
pub const HARDENED: u32 = 0x8000_0000;

/// Minimum number of path elements
pub const MIN_PATH_LEN: usize = 6;

/// Maximum number of path elements (count is a single byte)
pub const MAX_PATH_LEN: usize = 255;

/// Validated TON derivation path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<u32>);

/// Check a raw path lies within the TON hierarchy
pub fn validate_path(p: &[u32]) -> Result<(), ApduError> {
    if p.len() < MIN_PATH_LEN || p.len() > MAX_PATH_LEN {
        return Err(ApduError::InvalidPath);
    }
    if p[0] != PURPOSE || p[1] != COIN_TYPE {
        return Err(ApduError::InvalidPath);
    }
    if p.iter().any(|e| *e >= HARDENED) {
        return Err(ApduError::InvalidPath);
    }
    Ok(())
}

impl DerivationPath {
    /// Create a path from un-hardened elements
    pub fn new(elements: impl Into<Vec<u32>>) -> Result<Self, ApduError> {
        let e = elements.into();
        validate_path(&e)?;
        Ok(Self(e))
    }

    /// Standard wallet path `m/44'/607'/{workchain}'/0'/{account}'/0'`
    pub fn wallet(workchain: u32, account: u32) -> Result<Self, ApduError> {
        Self::new(vec![PURPOSE, COIN_TYPE, workchain, 0, account, 0])
    }

    /// Path elements (un-hardened)
    pub fn elements(&self) -> &[u32] {
        &self.0
    }

    /// Encode to a newly allocated buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(1 + self.0.len() * 4);
        b.push(self.0.len() as u8);
        for e in &self.0 {
            b.extend_from_slice(&write_u32(e + HARDENED));
        }
        b
    }
}

impl TryFrom<&[u32]> for DerivationPath {
    type Error = ApduError;

    fn try_from(p: &[u32]) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, e) in self.0.iter().enumerate() {
            buff[1 + i * 4..][..4].copy_from_slice(&write_u32(e + HARDENED));
        }

        Ok(n)
    }
}

/// Parse paths of the form `m/44'/607'/0'/0'/0'/0'`
///
/// The leading `m/` and hardening markers are optional, as every element
/// is hardened on encoding.
impl FromStr for DerivationPath {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("m/").unwrap_or(s);

        let mut elements = vec![];
        for p in s.split('/') {
            let p = p.trim_end_matches(|c: char| c == '\'' || c == 'h');
            let e = u32::from_str(p).map_err(|_| ApduError::InvalidPath)?;
            elements.push(e);
        }

        Self::new(elements)
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "m")?;
        for e in &self.0 {
            write!(f, "/{e}'")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate_paths() {
        let tests: &[(&[u32], bool)] = &[
            (&[44, 607, 0, 0, 0, 0], true),
            (&[44, 607, 0, 0, 7, 0, 1], true),
            (&[44, 607, 0, 0, 0], false),
            (&[45, 607, 0, 0, 0, 0], false),
            (&[44, 608, 0, 0, 0, 0], false),
            (&[44, 607, 0, HARDENED, 0, 0], false),
        ];

        for (p, ok) in tests {
            assert_eq!(validate_path(p).is_ok(), *ok, "path {p:?}");
        }

        assert!(validate_path(&vec![44; 256]).is_err());
    }

    #[test]
    fn encode_hardens_elements() {
        let p = DerivationPath::new(vec![44, 607, 0, 0, 0, 0]).unwrap();
        let b = p.to_bytes();

        assert_eq!(b.len(), 1 + 4 * 6);
        assert_eq!(b[0], 6);
        assert_eq!(&b[1..5], &[0x80, 0x00, 0x00, 0x2c]);
        assert_eq!(&b[5..9], &[0x80, 0x00, 0x02, 0x5f]);
        assert_eq!(&b[21..25], &[0x80, 0x00, 0x00, 0x00]);

        let mut buff = [0u8; 64];
        let n = p.encode(&mut buff).unwrap();
        assert_eq!(&buff[..n], &b[..]);
    }

    #[test]
    fn parse_and_display() {
        let p: DerivationPath = "m/44'/607'/0'/0'/3'/0'".parse().unwrap();
        assert_eq!(p.elements(), &[44, 607, 0, 0, 3, 0]);
        assert_eq!(p.to_string(), "m/44'/607'/0'/0'/3'/0'");

        let q: DerivationPath = "44/607/0/0/3/0".parse().unwrap();
        assert_eq!(p, q);

        assert_eq!(
            "m/44'/0'/0'/0'/0'/0'".parse::<DerivationPath>(),
            Err(ApduError::InvalidPath)
        );
        assert!("m/44'/607'/x".parse::<DerivationPath>().is_err());
    }
}
