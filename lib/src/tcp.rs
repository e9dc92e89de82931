// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Speculos TCP transport
//!
//! APDUs are framed with a 4-byte big-endian length prefix, responses
//! carry a length prefix covering the data only, followed by the 2-byte
//! status word.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    ops::Deref,
};

use async_trait::async_trait;
use ledger_apdu::{APDUAnswer, APDUCommand};
use ledger_transport::Exchange;
use log::{debug, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

/// Speculos TCP connection options
#[derive(Clone, Debug, PartialEq, clap::Parser)]
pub struct TcpOptions {
    /// Speculos APDU address
    #[clap(long = "tcp-addr", default_value = "127.0.0.1")]
    pub addr: IpAddr,

    /// Speculos APDU port
    #[clap(long = "tcp-port", default_value = "9999")]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9999,
        }
    }
}

impl TcpOptions {
    /// Socket address for these options
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// TCP transport errors
#[derive(Debug, thiserror::Error)]
pub enum TcpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("APDU data exceeds maximum length")]
    InvalidLength,

    #[error("Invalid APDU answer")]
    InvalidAnswer,
}

/// Speculos TCP transport
pub struct TransportTcp {
    s: Mutex<TcpStream>,
}

impl TransportTcp {
    /// Connect to a speculos instance
    pub async fn new(opts: TcpOptions) -> Result<Self, TcpError> {
        let addr = opts.socket_addr();
        debug!("Connecting to speculos at {}", addr);

        let s = TcpStream::connect(addr).await?;

        Ok(Self { s: Mutex::new(s) })
    }
}

#[async_trait]
impl Exchange for TransportTcp {
    type Error = TcpError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let data: &[u8] = &command.data;
        let n = u8::try_from(data.len()).map_err(|_| TcpError::InvalidLength)?;

        let mut apdu = Vec::with_capacity(5 + data.len());
        apdu.extend_from_slice(&[command.cla, command.ins, command.p1, command.p2, n]);
        apdu.extend_from_slice(data);

        let mut s = self.s.lock().await;

        trace!("tcp tx: {}", hex::encode(&apdu));
        s.write_all(&(apdu.len() as u32).to_be_bytes()).await?;
        s.write_all(&apdu).await?;

        let mut len = [0u8; 4];
        s.read_exact(&mut len).await?;
        let len = u32::from_be_bytes(len) as usize;

        let mut resp = vec![0u8; len + 2];
        s.read_exact(&mut resp).await?;
        trace!("tcp rx: {}", hex::encode(&resp));

        APDUAnswer::from_answer(resp).map_err(|_| TcpError::InvalidAnswer)
    }
}
