// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::str::FromStr;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

use crate::CellError;

const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

/// Standard TON address, workchain and 32-byte account hash
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Workchain identifier (0 basechain, -1 masterchain)
    pub workchain: i8,
    /// Account id (state-init hash for contracts)
    pub hash: [u8; 32],
}

/// Address decoded from user-friendly form, with flags
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FriendlyAddress {
    pub address: Address,
    pub bounceable: bool,
    pub test_only: bool,
}

impl Address {
    /// Create a new address
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Render as raw `workchain:hex` string
    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// Render as a 48-character url-safe user-friendly string
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut tag = match bounceable {
            true => TAG_BOUNCEABLE,
            false => TAG_NON_BOUNCEABLE,
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut b = [0u8; 36];
        b[0] = tag;
        b[1] = self.workchain as u8;
        b[2..34].copy_from_slice(&self.hash);

        let crc = CRC16.checksum(&b[..34]);
        b[34..].copy_from_slice(&crc.to_be_bytes());

        URL_SAFE.encode(b)
    }

    /// Parse a user-friendly address (url-safe or standard base64)
    pub fn parse_friendly(s: &str) -> Result<FriendlyAddress, CellError> {
        if s.len() != 48 {
            return Err(CellError::InvalidAddress("friendly address must be 48 characters"));
        }

        let b = match s.contains(|c: char| c == '-' || c == '_') {
            true => URL_SAFE.decode(s),
            false => STANDARD.decode(s),
        }
        .map_err(|_| CellError::InvalidAddress("invalid base64"))?;

        if b.len() != 36 {
            return Err(CellError::InvalidAddress("invalid length"));
        }

        let crc = CRC16.checksum(&b[..34]);
        if crc.to_be_bytes() != b[34..] {
            return Err(CellError::InvalidChecksum);
        }

        let test_only = b[0] & TAG_TEST_ONLY != 0;
        let bounceable = match b[0] & !TAG_TEST_ONLY {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(CellError::InvalidAddress("unknown address tag")),
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&b[2..34]);

        Ok(FriendlyAddress {
            address: Address::new(b[1] as i8, hash),
            bounceable,
            test_only,
        })
    }

    /// Parse a raw `workchain:hex` address
    pub fn parse_raw(s: &str) -> Result<Self, CellError> {
        let (wc, h) = s
            .split_once(':')
            .ok_or(CellError::InvalidAddress("missing workchain separator"))?;

        let wc = i32::from_str(wc).map_err(|_| CellError::InvalidAddress("invalid workchain"))?;
        let workchain = i8::try_from(wc).map_err(|_| CellError::InvalidWorkchain(wc))?;

        let mut hash = [0u8; 32];
        hex::decode_to_slice(h, &mut hash)
            .map_err(|_| CellError::InvalidAddress("invalid account hash"))?;

        Ok(Self { workchain, hash })
    }
}

/// Parse either raw or user-friendly address forms
impl FromStr for Address {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.contains(':') {
            true => Self::parse_raw(s),
            false => Self::parse_friendly(s).map(|f| f.address),
        }
    }
}

/// Display [Address] in raw form
impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl core::fmt::Debug for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Address({self})")
    }
}
