// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Application information and version APDUs

use core::{fmt::Display, str::FromStr};

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, APP_INFO_CLA, TON_APDU_CLA};
use crate::flags::Protocol;

/// Application name reported by the TON app
pub const TON_APP_NAME: &str = "TON";

/// First firmware version using the current protocol
pub const CURRENT_PROTOCOL_VERSION: AppVersion = AppVersion::new(2, 0, 0);

/// Fetch running application info APDU (handled by the device OS)
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct AppInfoReq {}

impl ApduStatic for AppInfoReq {
    /// Application Info command APDU is class `0xb0`
    const CLA: u8 = APP_INFO_CLA;

    /// Application Info GET APDU is instruction `0x01`
    const INS: u8 = Instruction::GetAppInfo as u8;
}

impl Encode for AppInfoReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

/// Application information response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    FORMAT     |   NAME_LEN    |            NAME...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  VERSION_LEN  |                  VERSION...                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     FLAGS (optional) ...                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AppInfoResp<'a> {
    /// Application name
    pub name: &'a str,

    /// Application version
    pub version: &'a str,
}

/// Response format byte
const APP_INFO_FORMAT: u8 = 1;

impl<'a> AppInfoResp<'a> {
    /// Create a new application info response
    pub fn new(name: &'a str, version: &'a str) -> Self {
        Self { name, version }
    }
}

impl<'a> Encode for AppInfoResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(3 + self.name.len() + self.version.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n || self.name.len() > 255 || self.version.len() > 255 {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = APP_INFO_FORMAT;
        index += 1;

        buff[index] = self.name.len() as u8;
        buff[index + 1..][..self.name.len()].copy_from_slice(self.name.as_bytes());
        index += 1 + self.name.len();

        buff[index] = self.version.len() as u8;
        buff[index + 1..][..self.version.len()].copy_from_slice(self.version.as_bytes());
        index += 1 + self.version.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for AppInfoResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }
        if buff[0] != APP_INFO_FORMAT {
            return Err(ApduError::InvalidEncoding);
        }
        let mut index = 1;

        let name = read_str(&buff[index..])?;
        index += 1 + name.len();

        let version = read_str(&buff[index..])?;
        index += 1 + version.len();

        // Trailing flags are ignored
        Ok((Self { name, version }, index))
    }
}

/// Read a length-prefixed string
fn read_str(buff: &[u8]) -> Result<&str, ApduError> {
    let n = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
    let b = buff.get(1..1 + n).ok_or(ApduError::InvalidLength)?;
    core::str::from_utf8(b).map_err(|_| ApduError::InvalidUtf8)
}

/// Fetch TON application version APDU
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct VersionReq {}

impl ApduStatic for VersionReq {
    const CLA: u8 = TON_APDU_CLA;
    const INS: u8 = Instruction::GetVersion as u8;
}

impl Encode for VersionReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

/// TON application version response
///
/// ## Encoding
///
/// ```text
/// +-----------+-----------+-----------+
/// | MAJOR (1) | MINOR (1) | PATCH (1) |
/// +-----------+-----------+-----------+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppVersion {
    /// Create a new version
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Protocol generation spoken by firmware of this version
    pub fn protocol(&self) -> Protocol {
        match *self < CURRENT_PROTOCOL_VERSION {
            true => Protocol::Legacy,
            false => Protocol::Current,
        }
    }
}

impl Encode for AppVersion {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(3)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < 3 {
            return Err(ApduError::InvalidLength);
        }
        buff[..3].copy_from_slice(&[self.major, self.minor, self.patch]);
        Ok(3)
    }
}

impl DecodeOwned for AppVersion {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 3 {
            return Err(ApduError::InvalidLength);
        }
        Ok((Self::new(buff[0], buff[1], buff[2]), 3))
    }
}

impl Display for AppVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for AppVersion {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut p = s.trim_start_matches('v').split('.');
        let mut next = || -> Result<u8, ApduError> {
            p.next()
                .and_then(|v| v.parse().ok())
                .ok_or(ApduError::InvalidEncoding)
        };

        let v = Self::new(next()?, next()?, next()?);
        match p.next() {
            Some(_) => Err(ApduError::InvalidEncoding),
            None => Ok(v),
        }
    }
}
