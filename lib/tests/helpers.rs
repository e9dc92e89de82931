// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Scripted TON app for exercising [DeviceHandle] without hardware

#![allow(unused)]

use std::{
    collections::HashMap,
    ops::Deref,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use ledger_apdu::{APDUAnswer, APDUCommand};
use log::{debug, LevelFilter};
use sha2::{Digest, Sha256};
use simplelog::SimpleLogger;

use ledger_ton::{
    apdu::flags::Protocol,
    DeviceConfig, DeviceHandle, Exchange,
};

/// Status words returned by the scripted app
pub const SW_OK: u16 = 0x9000;
pub const SW_USER_REJECTED: u16 = 0x6985;
pub const SW_BAD_STATE: u16 = 0x6a80;

/// Recorded APDU
#[derive(Clone, Debug, PartialEq)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("device disconnected")]
    Disconnected,
    #[error("invalid answer")]
    InvalidAnswer,
}

/// Scripted TON app state
pub struct MockState {
    /// Signing key standing in for the device seed
    pub key: SigningKey,
    /// Application name reported by app info
    pub app_name: String,
    /// Application version reported by app info and version requests
    pub version: [u8; 3],
    /// Accept only single-shot signing
    pub legacy: bool,
    /// Public key length returned for address requests
    pub key_len: usize,
    /// Delay applied to every exchange
    pub delay: Option<Duration>,
    /// Status word returned for signing requests
    pub sign_status: u16,

    /// Request bodies mapped to the reported hash and the signed hash
    pub hashes: Mutex<HashMap<Vec<u8>, ([u8; 32], [u8; 32])>>,
    /// Open chunked request (path then body)
    pub pending: Mutex<Option<Vec<u8>>>,
    /// APDUs in arrival order
    pub log: Mutex<Vec<Apdu>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            key: SigningKey::from_bytes(&[0x42; 32]),
            app_name: "TON".to_string(),
            version: [2, 1, 0],
            legacy: false,
            key_len: 32,
            delay: None,
            sign_status: SW_OK,
            hashes: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
            log: Mutex::new(vec![]),
        }
    }
}

/// Scripted device, clones share state
#[derive(Clone)]
pub struct MockDevice(pub Arc<MockState>);

impl MockDevice {
    pub fn new(state: MockState) -> Self {
        Self(Arc::new(state))
    }

    /// Verifying key for the device signing key
    pub fn public_key(&self) -> VerifyingKey {
        self.0.key.verifying_key()
    }

    /// Set the hash signed in response to the provided request body
    pub fn expect(&self, body: &[u8], hash: [u8; 32]) {
        self.0.hashes.lock().unwrap().insert(body.to_vec(), (hash, hash));
    }

    /// Report `cell_hash` and sign `envelope`, as the app does for sign-data
    pub fn expect_data(&self, body: &[u8], cell_hash: [u8; 32], envelope: [u8; 32]) {
        self.0
            .hashes
            .lock()
            .unwrap()
            .insert(body.to_vec(), (cell_hash, envelope));
    }

    /// APDUs received so far
    pub fn log(&self) -> Vec<Apdu> {
        self.0.log.lock().unwrap().clone()
    }

    /// Build a handle over this device
    pub fn handle(&self, protocol: Protocol) -> DeviceHandle<MockDevice> {
        DeviceHandle::with_config(
            self.clone(),
            DeviceConfig {
                protocol,
                request_timeout: None,
            },
        )
    }

    fn respond(&self, a: &Apdu) -> (Vec<u8>, u16) {
        let s = &self.0;

        match (a.cla, a.ins) {
            // App info
            (0xb0, 0x01) => {
                let version = format!("{}.{}.{}", s.version[0], s.version[1], s.version[2]);

                let mut r = vec![0x01, s.app_name.len() as u8];
                r.extend_from_slice(s.app_name.as_bytes());
                r.push(version.len() as u8);
                r.extend_from_slice(version.as_bytes());
                r.extend_from_slice(&[0x01, 0x00]);

                (r, SW_OK)
            }
            // Version
            (0xe0, 0x03) => (s.version.to_vec(), SW_OK),
            // Address
            (0xe0, 0x05) => {
                let k = s.key.verifying_key().to_bytes();
                (k[..s.key_len.min(32)].to_vec(), SW_OK)
            }
            // Address proof
            (0xe0, 0x08) => {
                let hash: [u8; 32] = Sha256::digest(&a.data).into();
                (self.signature(hash, hash), s.sign_status)
            }
            // Transaction and data signing
            (0xe0, 0x06) | (0xe0, 0x09) if s.legacy => self.single_shot(a),
            (0xe0, 0x06) | (0xe0, 0x09) => self.chunked(a),
            _ => (vec![], 0x6d00),
        }
    }

    fn single_shot(&self, a: &Apdu) -> (Vec<u8>, u16) {
        let mut pending = self.0.pending.lock().unwrap();

        match (a.p1, pending.take()) {
            (0x00, _) => {
                *pending = Some(vec![]);
                (vec![], SW_OK)
            }
            (0x01, Some(_)) => self.sign_body(&a.data),
            _ => (vec![], SW_BAD_STATE),
        }
    }

    fn chunked(&self, a: &Apdu) -> (Vec<u8>, u16) {
        let mut pending = self.0.pending.lock().unwrap();

        match (a.p2, pending.as_mut()) {
            // A new transfer while another is open is a protocol error
            (0x03, Some(_)) => {
                *pending = None;
                (vec![], SW_BAD_STATE)
            }
            (0x03, None) => {
                *pending = Some(vec![]);
                (vec![], SW_OK)
            }
            (0x02, Some(b)) => {
                b.extend_from_slice(&a.data);
                (vec![], SW_OK)
            }
            (0x00, Some(b)) => {
                b.extend_from_slice(&a.data);
                let body = pending.take().unwrap_or_default();
                self.sign_body(&body)
            }
            _ => (vec![], SW_BAD_STATE),
        }
    }

    fn sign_body(&self, body: &[u8]) -> (Vec<u8>, u16) {
        if self.0.sign_status != SW_OK {
            return (vec![], self.0.sign_status);
        }

        let (reported, signed) = match self.0.hashes.lock().unwrap().get(body) {
            Some(h) => *h,
            None => {
                let h = Sha256::digest(body).into();
                (h, h)
            }
        };

        (self.signature(reported, signed), SW_OK)
    }

    fn signature(&self, reported: [u8; 32], signed: [u8; 32]) -> Vec<u8> {
        let sig = self.0.key.sign(&signed).to_bytes();

        let mut r = vec![64];
        r.extend_from_slice(&sig);
        r.push(32);
        r.extend_from_slice(&reported);
        r
    }
}

#[async_trait]
impl Exchange for MockDevice {
    type Error = MockError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        // Give other tasks a chance to interleave
        tokio::task::yield_now().await;
        if let Some(d) = self.0.delay {
            tokio::time::sleep(d).await;
        }

        let a = Apdu {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: command.data.to_vec(),
        };

        let (mut r, sw) = self.respond(&a);
        debug!("mock {:02x?} -> {:04x}", a, sw);

        self.0.log.lock().unwrap().push(a);

        r.extend_from_slice(&sw.to_be_bytes());
        APDUAnswer::from_answer(r).map_err(|_| MockError::InvalidAnswer)
    }
}

/// Setup logging from the `LOG_LEVEL` environment variable
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Info,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Default basechain wallet path (un-hardened elements)
pub const PATH: &[u32] = &[44, 607, 0, 0, 0, 0];
