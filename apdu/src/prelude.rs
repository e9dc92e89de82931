// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of APDU objects

pub use crate::{
    address::AddressReq,
    app_info::{AppInfoReq, AppInfoResp, AppVersion, VersionReq},
    flags::{AddressOptions, Chain, Protocol},
    path::DerivationPath,
    payload::{
        EncodedPayload, JettonBurn, JettonTransfer, NftTransfer, PayloadKind,
        SingleNominatorWithdraw, TonPayload,
    },
    proof::ProofReq,
    response::{AddressResp, SignatureResp},
    sign_data::{AppData, EncodedSignData, SignDataRequest},
    transfer::{PreparedTransfer, SendMode, Transfer, WalletSpecifiers},
    ApduError, ApduReq, ApduStatic, ChunkP2, Instruction, LegacyP1,
};
