// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address flags, chain selection and protocol generations

use crate::ApduError;

/// Firmware protocol generation
///
/// Legacy firmware (`< 2.0.0`) uses a different address flag layout and
/// single-shot transaction signing.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Protocol {
    Legacy,
    #[default]
    Current,
}

/// TON chain (workchain) selection
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Default, strum::Display, num_enum::TryFromPrimitive,
)]
#[repr(i8)]
pub enum Chain {
    /// Basechain (workchain 0)
    #[default]
    Base = 0,
    /// Masterchain (workchain -1)
    Master = -1,
}

impl Chain {
    /// Resolve a chain from a workchain id
    pub fn from_id(id: i32) -> Result<Self, ApduError> {
        i8::try_from(id)
            .ok()
            .and_then(|v| Chain::try_from(v).ok())
            .ok_or(ApduError::InvalidChain(id))
    }

    /// Workchain id for this chain
    pub fn workchain(&self) -> i8 {
        *self as i8
    }
}

bitflags::bitflags! {
    /// Address request flags
    pub struct AddressFlags: u8 {
        /// Render for test network
        const TEST_ONLY = 1 << 0;
        /// Masterchain address
        const MASTERCHAIN = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Address request flags for legacy firmware
    pub struct LegacyAddressFlags: u8 {
        /// Render as non-bounceable
        const NON_BOUNCEABLE = 1 << 0;
        /// Render for test network
        const TEST_ONLY = 1 << 1;
        /// Masterchain address
        const MASTERCHAIN = 1 << 2;
    }
}

/// Address rendering options
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressOptions {
    pub chain: Chain,
    pub test_only: bool,
    pub bounceable: bool,
}

impl Default for AddressOptions {
    fn default() -> Self {
        Self {
            chain: Chain::Base,
            test_only: false,
            bounceable: true,
        }
    }
}

impl AddressOptions {
    /// Build the flags byte for the provided protocol generation
    pub fn flags(&self, protocol: Protocol) -> u8 {
        let master = self.chain == Chain::Master;

        match protocol {
            Protocol::Current => {
                let mut f = AddressFlags::empty();
                f.set(AddressFlags::TEST_ONLY, self.test_only);
                f.set(AddressFlags::MASTERCHAIN, master);
                f.bits()
            }
            Protocol::Legacy => {
                let mut f = LegacyAddressFlags::empty();
                f.set(LegacyAddressFlags::NON_BOUNCEABLE, !self.bounceable);
                f.set(LegacyAddressFlags::TEST_ONLY, self.test_only);
                f.set(LegacyAddressFlags::MASTERCHAIN, master);
                f.bits()
            }
        }
    }
}
