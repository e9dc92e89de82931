// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Generic transport abstraction for hiding underlying transport types

use std::ops::Deref;

use async_trait::async_trait;
use ledger_apdu::{APDUAnswer, APDUCommand};
use ledger_transport::Exchange;

#[cfg(feature = "transport_hid")]
pub use ledger_transport_hid::{LedgerHIDError, TransportNativeHID};

#[cfg(feature = "transport_tcp")]
pub use crate::tcp::{TcpError, TcpOptions, TransportTcp};

/// Generic ledger device (abstract over transport types)
#[derive(strum::Display)]
#[non_exhaustive]
pub enum GenericTransport {
    #[cfg(feature = "transport_hid")]
    Hid(TransportNativeHID),
    #[cfg(feature = "transport_tcp")]
    Tcp(TransportTcp),
}

/// Generic transport error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    #[cfg(feature = "transport_hid")]
    #[error("HID: {0}")]
    Hid(LedgerHIDError),

    #[cfg(feature = "transport_tcp")]
    #[error("TCP: {0}")]
    Tcp(TcpError),
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<TransportNativeHID> for GenericTransport {
    fn from(t: TransportNativeHID) -> Self {
        Self::Hid(t)
    }
}

/// Convert a TCP transport into a generic transport
#[cfg(feature = "transport_tcp")]
impl From<TransportTcp> for GenericTransport {
    fn from(t: TransportTcp) -> Self {
        Self::Tcp(t)
    }
}

/// Implementation of [Exchange] for [GenericTransport], hiding transport error types
#[async_trait]
impl Exchange for GenericTransport {
    type Error = TransportError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        match self {
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.exchange(command).await.map_err(TransportError::Hid),
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(t) => t.exchange(command).await.map_err(TransportError::Tcp),
            #[cfg(not(any(feature = "transport_hid", feature = "transport_tcp")))]
            _ => unreachable!("no transports enabled"),
        }
    }
}
