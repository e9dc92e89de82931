// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the TON app
//! and is generic over [ledger_transport::Exchange]

use std::{
    fmt::{Debug, Display},
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use ed25519_dalek::VerifyingKey;
use encdec::{Decode, DecodeOwned};
use ledger_transport::Exchange;
use log::debug;
use tokio::sync::Mutex;

use ledger_ton_apdu::{
    app_info::{AppInfoReq, AppInfoResp, AppVersion, VersionReq, TON_APP_NAME},
    flags::{AddressOptions, Protocol},
    path::DerivationPath,
    prelude::{AddressReq, AddressResp, ProofReq, SignatureResp},
    sign_data::SignDataRequest,
    transfer::Transfer,
    wallet, ApduError, ApduReq, Instruction, CHUNK_SIZE,
};
use ledger_ton_cell::{Address, Cell, StateInit, TreeNode};

use crate::{
    exchange::{exchange, single_shot, ChunkedExchange},
    verify::{signed_message, verify_signature, verify_signed_data, verify_signed_hash},
    Error,
};

/// Device handle configuration
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DeviceConfig {
    /// Firmware protocol generation
    pub protocol: Protocol,
    /// Bound on a whole admitted operation
    pub request_timeout: Option<Duration>,
}

/// TON handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different underlying
/// transports. Clones share the device, operations are admitted one at a
/// time in arrival order and hold the device for every APDU they issue.
#[derive(Clone)]
pub struct DeviceHandle<T: Exchange> {
    /// Device handle for communication
    t: Arc<Mutex<T>>,
    /// Handle configuration
    config: DeviceConfig,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T> From<T> for DeviceHandle<T>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    fn from(t: T) -> Self {
        Self::with_config(t, DeviceConfig::default())
    }
}

/// Running application information
#[derive(Clone, Debug, PartialEq)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: String,
}

/// Public key and rendering options returned by an address request
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceAddress {
    /// Wallet public key
    pub public_key: VerifyingKey,
    /// Options the address was requested with
    pub options: AddressOptions,
}

impl DeviceAddress {
    /// Wallet v4 state-init for the provided contract code
    pub fn wallet_state_init(&self, code: &Cell) -> Result<StateInit, ApduError> {
        wallet::wallet_v4_state_init(code, self.public_key.as_bytes(), self.options.chain)
    }

    /// Wallet v4 contract address for the provided contract code
    pub fn wallet_address(&self, code: &Cell) -> Result<Address, ApduError> {
        wallet::wallet_v4_address(code, self.public_key.as_bytes(), self.options.chain)
    }

    /// Render the wallet address in user-friendly form using the request options
    pub fn wallet_address_string(&self, code: &Cell) -> Result<String, ApduError> {
        let a = self.wallet_address(code)?;
        Ok(a.to_friendly(self.options.bounceable, self.options.test_only))
    }
}

/// Options for sign-data requests
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct SignDataOptions {
    /// Request timestamp (unix seconds), current time when unset
    pub timestamp: Option<u64>,
}

/// Signed data response
#[derive(Clone, Debug, PartialEq)]
pub struct SignedData {
    pub signature: [u8; 64],
    pub cell: Cell,
    pub timestamp: u64,
    /// Safe-sign envelope hash covered by `signature`
    pub hash: [u8; 32],
}

/// Address proof parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ProofParams {
    /// Requesting application domain
    pub domain: String,
    /// Proof timestamp (unix seconds)
    pub timestamp: u64,
    /// Application challenge
    pub payload: Vec<u8>,
}

/// Signed address proof
#[derive(Clone, Debug, PartialEq)]
pub struct AddressProof {
    pub signature: [u8; 64],
    pub hash: [u8; 32],
}

impl<T> DeviceHandle<T>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    /// Create a handle with the provided configuration
    pub fn with_config(t: T, config: DeviceConfig) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            config,
        }
    }

    /// Fetch handle configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Set the protocol generation used by this handle
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.config.protocol = protocol;
    }

    /// Set the bound applied to each admitted operation
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.request_timeout = timeout;
    }

    /// Apply the configured timeout to an admitted operation
    async fn bounded<R>(
        &self,
        f: impl Future<Output = Result<R, Error<T::Error>>>,
    ) -> Result<R, Error<T::Error>> {
        match self.config.request_timeout {
            Some(d) => tokio::time::timeout(d, f).await?,
            None => f.await,
        }
    }

    /// Issue a single APDU request with exclusive device access
    async fn request(&self, req: &impl ApduReq) -> Result<Vec<u8>, Error<T::Error>> {
        let cmd = req.command()?;

        let t = self.t.lock().await;
        self.bounded(exchange(&*t, &cmd)).await
    }

    /// Fetch running application info
    pub async fn app_info(&self) -> Result<AppInfo, Error<T::Error>> {
        debug!("Requesting app info");

        let resp = self.request(&AppInfoReq {}).await?;
        let (i, _) = AppInfoResp::decode(&resp)
            .map_err(|_| Error::DeviceResponse("malformed app info"))?;

        Ok(AppInfo {
            app_name: i.name.to_string(),
            app_version: i.version.to_string(),
        })
    }

    /// Check whether the TON app is running
    pub async fn is_app_open(&self) -> Result<bool, Error<T::Error>> {
        let i = self.app_info().await?;
        Ok(i.app_name == TON_APP_NAME)
    }

    /// Fetch the TON app version
    pub async fn version(&self) -> Result<AppVersion, Error<T::Error>> {
        debug!("Requesting app version");

        let resp = self.request(&VersionReq {}).await?;
        let (v, _) = AppVersion::decode_owned(&resp)
            .map_err(|_| Error::DeviceResponse("malformed version"))?;

        Ok(v)
    }

    /// Query the app version and configure the matching protocol generation
    pub async fn detect_protocol(&mut self) -> Result<Protocol, Error<T::Error>> {
        let i = self.app_info().await?;
        if i.app_name != TON_APP_NAME {
            return Err(Error::UnexpectedApp(i.app_name));
        }

        let v = self.version().await?;
        let p = v.protocol();

        debug!("App version {} using {} protocol", v, p);
        self.config.protocol = p;

        Ok(p)
    }

    /// Fetch the public key for a derivation path
    pub async fn get_address(
        &self,
        path: &[u32],
        opts: &AddressOptions,
    ) -> Result<DeviceAddress, Error<T::Error>> {
        self.address(path, opts, false).await
    }

    /// Fetch the public key for a derivation path, displaying the address
    /// on the device for user confirmation
    pub async fn validate_address(
        &self,
        path: &[u32],
        opts: &AddressOptions,
    ) -> Result<DeviceAddress, Error<T::Error>> {
        self.address(path, opts, true).await
    }

    async fn address(
        &self,
        path: &[u32],
        opts: &AddressOptions,
        confirm: bool,
    ) -> Result<DeviceAddress, Error<T::Error>> {
        let path = DerivationPath::new(path)?;

        debug!("Requesting address for {} (confirm: {})", path, confirm);

        let req = AddressReq::new(path, opts.flags(self.config.protocol), confirm);
        let resp = self.request(&req).await?;

        let (r, _) = AddressResp::decode_owned(&resp)
            .map_err(|_| Error::DeviceResponse("public key must be 32 bytes"))?;
        let public_key = VerifyingKey::from_bytes(&r.public_key).map_err(|_| Error::InvalidKey)?;

        Ok(DeviceAddress {
            public_key,
            options: *opts,
        })
    }

    /// Sign a transfer, returning the signed message cell
    pub async fn sign_transaction(
        &self,
        path: &[u32],
        tx: &Transfer,
    ) -> Result<Cell, Error<T::Error>> {
        let path = DerivationPath::new(path)?;
        let prepared = tx.prepare()?;

        let protocol = self.config.protocol;
        if protocol == Protocol::Legacy && prepared.request.len() > CHUNK_SIZE {
            return Err(Error::Encoding(ApduError::InvalidLength));
        }

        let key = self
            .get_address(path.elements(), &AddressOptions::default())
            .await?
            .public_key;

        debug!(
            "Signing transfer ({} byte request, {} protocol)",
            prepared.request.len(),
            protocol
        );

        let resp = {
            let t = self.t.lock().await;

            self.bounded(async {
                match protocol {
                    Protocol::Current => {
                        ChunkedExchange::new(&*t, Instruction::SignTx)
                            .run(&path, &prepared.request)
                            .await
                    }
                    Protocol::Legacy => {
                        single_shot(&*t, Instruction::SignTx, &path, &prepared.request).await
                    }
                }
            })
            .await?
        };

        let (r, _) = SignatureResp::decode_owned(&resp)
            .map_err(|_| Error::DeviceResponse("short signature response"))?;

        verify_signed_hash::<T::Error>(&prepared.signing_cell.hash(), &r, &key)?;

        Ok(signed_message(&r.signature, &prepared.signing_cell)?)
    }

    /// Sign a data request
    pub async fn sign_data(
        &self,
        path: &[u32],
        req: &SignDataRequest,
        opts: &SignDataOptions,
    ) -> Result<SignedData, Error<T::Error>> {
        let path = DerivationPath::new(path)?;
        let encoded = req.encode()?;

        let timestamp = match opts.timestamp {
            Some(t) => t,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };
        let body = encoded.request(timestamp);
        let cell_hash = encoded.cell.hash();
        let envelope = encoded.hash(timestamp);

        let key = self
            .get_address(path.elements(), &AddressOptions::default())
            .await?
            .public_key;

        debug!("Signing data (schema: {:08x}, timestamp: {})", encoded.schema, timestamp);

        let resp = {
            let t = self.t.lock().await;

            self.bounded(ChunkedExchange::new(&*t, Instruction::SignData).run(&path, &body))
                .await?
        };

        let (r, _) = SignatureResp::decode_owned(&resp)
            .map_err(|_| Error::DeviceResponse("short signature response"))?;

        verify_signed_data::<T::Error>(&cell_hash, &envelope, &r, &key)?;

        Ok(SignedData {
            signature: r.signature,
            cell: encoded.cell,
            timestamp,
            hash: envelope,
        })
    }

    /// Sign a plain text message
    pub async fn sign_message(
        &self,
        path: &[u32],
        text: &str,
    ) -> Result<SignedData, Error<T::Error>> {
        self.sign_data(
            path,
            &SignDataRequest::plaintext(text),
            &SignDataOptions::default(),
        )
        .await
    }

    /// Sign an address ownership proof
    pub async fn get_address_proof(
        &self,
        path: &[u32],
        params: &ProofParams,
        opts: &AddressOptions,
    ) -> Result<AddressProof, Error<T::Error>> {
        let path = DerivationPath::new(path)?;

        let req = ProofReq {
            flags: opts.flags(self.config.protocol),
            path,
            domain: params.domain.clone(),
            timestamp: params.timestamp,
            payload: params.payload.clone(),
        };
        // Check the request fits before prompting for the key
        req.command()?;

        let key = self.get_address(req.path.elements(), opts).await?.public_key;

        debug!("Requesting address proof for domain '{}'", params.domain);

        let resp = self.request(&req).await?;
        let (r, _) = SignatureResp::decode_owned(&resp)
            .map_err(|_| Error::DeviceResponse("short signature response"))?;

        verify_signature::<T::Error>(&r.hash, &r.signature, &key)?;

        Ok(AddressProof {
            signature: r.signature,
            hash: r.hash,
        })
    }
}
