// Copyright (c) 2022-2023 The MobileCoin Foundation

use base64::prelude::{Engine as _, BASE64_STANDARD, BASE64_URL_SAFE};

use ledger_ton::cell::{boc, Cell};

/// Variable length hex-encoded argument
#[derive(Clone, PartialEq, Debug, Default)]
pub struct HexVec(pub Vec<u8>);

impl std::str::FromStr for HexVec {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim_start_matches("0x")).map(HexVec)
    }
}

/// Base64 bag-of-cells argument
#[derive(Clone, PartialEq, Debug)]
pub struct BocData(pub Cell);

impl std::str::FromStr for BocData {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_boc(s).map(BocData)
    }
}

/// Decode a base64 (standard or url-safe) bag-of-cells
pub fn parse_boc(s: &str) -> anyhow::Result<Cell> {
    let b = match s.contains(|c: char| c == '-' || c == '_') {
        true => BASE64_URL_SAFE.decode(s)?,
        false => BASE64_STANDARD.decode(s)?,
    };

    let c = boc::deserialize(&b)?;
    Ok(c)
}

/// Encode a cell as a base64 bag-of-cells
pub fn encode_boc(c: &Cell) -> String {
    BASE64_STANDARD.encode(boc::serialize(c, true))
}
