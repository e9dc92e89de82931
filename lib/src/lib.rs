// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ledger TON API Library (and CLI)
//!
//! Provides a [DeviceHandle] for the TON ledger app, generic over
//! [Exchange] transports, with [LedgerProvider] for discovering and
//! connecting to HID devices and speculos instances.

pub use ledger_transport::Exchange;

#[cfg(feature = "transport_hid")]
use hidapi::HidApi;

/// Re-export transports for consumer use
pub mod transport;
use transport::*;

#[cfg(feature = "transport_tcp")]
mod tcp;

/// Re-export `ledger-ton-apdu` and `ledger-ton-cell` for consumers
pub use ledger_ton_apdu::{self as apdu};
pub use ledger_ton_cell::{self as cell};

mod exchange;
pub use exchange::ExchangeState;

mod handle;
pub use handle::{
    AddressProof, AppInfo, DeviceAddress, DeviceConfig, DeviceHandle, ProofParams,
    SignDataOptions, SignedData,
};

mod error;
pub use error::Error;

pub mod verify;

/// Discovers and connects to TON app devices
pub struct LedgerProvider {
    #[cfg(feature = "transport_hid")]
    hid_api: HidApi,
}

/// Device discovery filter
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
pub enum Filter {
    Any,
    Hid,
    Tcp,
}

/// Discovered device, passed back to [LedgerProvider::connect]
#[derive(Debug)]
pub enum LedgerInfo {
    #[cfg(feature = "transport_hid")]
    Hid(hidapi::DeviceInfo),
    #[cfg(feature = "transport_tcp")]
    Tcp(TcpOptions),
}

impl LedgerProvider {
    /// Only one provider may exist at a time (global HID context)
    pub fn new() -> Result<Self, Error<TransportError>> {
        Ok(Self {
            #[cfg(feature = "transport_hid")]
            hid_api: HidApi::new().map_err(|_| Error::HidInit)?,
        })
    }

    /// List devices matching `filter`, probing the default speculos port for TCP
    pub async fn list_devices(&self, filter: Filter) -> Vec<LedgerInfo> {
        #[allow(unused_mut)]
        let mut devices = vec![];

        #[cfg(feature = "transport_hid")]
        if matches!(filter, Filter::Any | Filter::Hid) {
            devices.extend(
                TransportNativeHID::list_ledgers(&self.hid_api)
                    .cloned()
                    .map(LedgerInfo::Hid),
            );
        }

        #[cfg(feature = "transport_tcp")]
        if matches!(filter, Filter::Any | Filter::Tcp) {
            let o = TcpOptions::default();
            if tokio::net::TcpStream::connect(o.socket_addr()).await.is_ok() {
                devices.push(LedgerInfo::Tcp(o));
            }
        }

        log::debug!("Found {} devices (filter: {})", devices.len(), filter);

        devices
    }

    /// Open a handle to a listed device
    #[cfg(any(feature = "transport_hid", feature = "transport_tcp"))]
    pub async fn connect(
        &self,
        info: &LedgerInfo,
    ) -> Result<DeviceHandle<GenericTransport>, Error<TransportError>> {
        let t = match info {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(d) => TransportNativeHID::open_device(&self.hid_api, d)
                .map(GenericTransport::Hid)
                .map_err(|e| Error::Transport(TransportError::Hid(e)))?,
            #[cfg(feature = "transport_tcp")]
            LedgerInfo::Tcp(o) => TransportTcp::new(o.clone())
                .await
                .map(GenericTransport::Tcp)
                .map_err(|e| Error::Transport(TransportError::Tcp(e)))?,
        };

        Ok(DeviceHandle::from(t))
    }
}

impl std::fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(d) => write!(
                f,
                "{:16} (USB, {})",
                d.product_string().unwrap_or("UNKNOWN"),
                d.serial_number().unwrap_or("UNKNOWN"),
            ),
            #[cfg(feature = "transport_tcp")]
            LedgerInfo::Tcp(o) => write!(f, "{:16} (TCP, {}:{})", "Speculos", o.addr, o.port),
            #[cfg(not(any(feature = "transport_hid", feature = "transport_tcp")))]
            _ => unreachable!("no transports enabled"),
        }
    }
}
