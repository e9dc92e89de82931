// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with the Ledger TON app

use std::{error::Error, path::Path, time::Duration};

use clap::Parser;
use ledger_transport::Exchange;
use log::{debug, error, info, LevelFilter};
use serde::{de::DeserializeOwned, Serialize};

use ledger_ton::{
    apdu::{
        flags::{AddressOptions, Chain, Protocol},
        path::DerivationPath,
        sign_data::SignDataRequest,
    },
    cell::TreeNode,
    DeviceHandle, Filter, LedgerProvider, ProofParams, SignDataOptions,
};

mod helpers;
use helpers::*;

mod input;
use input::*;

/// Default wallet derivation path (workchain 0, account 0)
const DEFAULT_PATH: &str = "m/44'/607'/0'/0'/0'/0'";

/// Ledger TON command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Supported transports for ledger discovery
    #[clap(long, value_enum, default_value = "any")]
    target: Filter,

    /// Device index (where more than one device is available)
    #[clap(long, default_value = "0")]
    device_index: usize,

    /// Force the signing protocol (detected from the app version by default)
    #[clap(long)]
    protocol: Option<Protocol>,

    /// Per-operation timeout in seconds (including user confirmation)
    #[clap(long)]
    timeout: Option<u64>,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Address rendering arguments
#[derive(Clone, PartialEq, Debug, clap::Args)]
struct AddressArgs {
    /// Chain id (0 basechain, -1 masterchain)
    #[clap(long, default_value = "0", allow_hyphen_values = true)]
    chain: i32,

    /// Render testnet-only addresses
    #[clap(long)]
    testnet: bool,

    /// Render non-bounceable addresses
    #[clap(long)]
    non_bounceable: bool,
}

impl AddressArgs {
    fn options(&self) -> anyhow::Result<AddressOptions> {
        Ok(AddressOptions {
            chain: Chain::from_id(self.chain)?,
            test_only: self.testnet,
            bounceable: !self.non_bounceable,
        })
    }
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch application info
    AppInfo,

    /// Fetch TON app version
    Version,

    /// Fetch the wallet public key (and address) for a derivation path
    Address {
        /// BIP-0044 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        #[clap(flatten)]
        address: AddressArgs,

        /// Display the address on the device for confirmation
        #[clap(long)]
        confirm: bool,

        /// Wallet v4 contract code (base64 BoC) for address derivation
        #[clap(long)]
        wallet_code: Option<BocData>,
    },

    /// Sign a transfer
    Sign {
        /// BIP-0044 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        /// Transfer input file (.json)
        #[clap(long)]
        input: String,

        /// Signed message output file (.json)
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign a plain text message
    SignData {
        /// BIP-0044 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        /// Text to be signed
        #[clap(long)]
        text: String,

        /// Request timestamp (unix seconds, defaults to now)
        #[clap(long)]
        timestamp: Option<u64>,
    },

    /// Sign an address ownership proof
    Proof {
        /// BIP-0044 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        #[clap(flatten)]
        address: AddressArgs,

        /// Requesting application domain
        #[clap(long)]
        domain: String,

        /// Proof timestamp (unix seconds)
        #[clap(long)]
        timestamp: u64,

        /// Hex-encoded application challenge
        #[clap(long, default_value = "")]
        payload: HexVec,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Connect to ledger device
    let p = LedgerProvider::new()?;

    debug!("Using transport: {:?}", args.target);

    // List available devices
    let devices = p.list_devices(args.target).await;
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    debug!(
        "Using device {}: {}",
        args.device_index, devices[args.device_index]
    );

    // Connect to device
    let mut t = match p.connect(&devices[args.device_index]).await {
        Ok(v) => v,
        Err(e) => {
            error!(
                "Failed to connect to device: {}",
                devices[args.device_index]
            );
            return Err(e.into());
        }
    };

    // Apply per-operation timeout
    t.set_timeout(args.timeout.map(Duration::from_secs));

    // Select signing protocol
    match args.protocol {
        Some(p) => t.set_protocol(p),
        None if needs_protocol(&args.cmd) => {
            let p = t.detect_protocol().await?;
            debug!("Detected protocol: {}", p);
        }
        None => (),
    }

    // Execute command
    execute(t, args.cmd).await?;

    Ok(())
}

/// Check whether a command depends on the app protocol version
fn needs_protocol(cmd: &Actions) -> bool {
    matches!(
        cmd,
        Actions::Address { .. } | Actions::Sign { .. } | Actions::Proof { .. }
    )
}

/// Execute a command with the provided transport
async fn execute<T, E>(t: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Sync + Send,
    E: Error + Sync + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::AppInfo => {
            let i = t.app_info().await?;

            info!("app info: {:#?}", i);
        }
        Actions::Version => {
            let v = t.version().await?;

            info!("TON app version: {} ({} protocol)", v, v.protocol());
        }
        Actions::Address {
            path,
            address,
            confirm,
            wallet_code,
        } => {
            let opts = address.options()?;

            info!("requesting address for path: {}", path);

            let a = match confirm {
                true => {
                    info!("confirm the address on the device");
                    t.validate_address(path.elements(), &opts).await?
                }
                false => t.get_address(path.elements(), &opts).await?,
            };

            info!("public key: {}", hex::encode(a.public_key.as_bytes()));

            if let Some(code) = wallet_code {
                let w = a.wallet_address(&code.0)?;

                info!("wallet address: {}", w);
                info!(
                    "friendly address: {}",
                    w.to_friendly(opts.bounceable, opts.test_only)
                );
            }
        }
        Actions::Sign {
            path,
            input,
            output,
        } => {
            // Read in transfer file
            let i: TransferInput = read_input(&input).await?;
            let tx = i.to_transfer()?;

            info!(
                "signing transfer of {} nanotons to {} (seqno: {})",
                tx.amount, tx.to, tx.seqno
            );

            // Await user approval and signature
            let signed = t.sign_transaction(path.elements(), &tx).await?;

            let resp = SignedOutput {
                boc: encode_boc(&signed),
                hash: hex::encode(signed.hash()),
            };

            info!("signed message hash: {}", resp.hash);

            match output {
                Some(o) => write_output(&o, &resp).await?,
                None => info!("signed message: {}", resp.boc),
            }
        }
        Actions::SignData {
            path,
            text,
            timestamp,
        } => {
            info!("signing message: '{}'", text);

            let s = t
                .sign_data(
                    path.elements(),
                    &SignDataRequest::plaintext(text),
                    &SignDataOptions { timestamp },
                )
                .await?;

            info!("timestamp: {}", s.timestamp);
            info!("hash: {}", hex::encode(s.hash));
            info!("signature: {}", hex::encode(s.signature));
        }
        Actions::Proof {
            path,
            address,
            domain,
            timestamp,
            payload,
        } => {
            let opts = address.options()?;

            info!("requesting address proof for domain: '{}'", domain);

            let p = t
                .get_address_proof(
                    path.elements(),
                    &ProofParams {
                        domain,
                        timestamp,
                        payload: payload.0,
                    },
                    &opts,
                )
                .await?;

            info!("hash: {}", hex::encode(p.hash));
            info!("signature: {}", hex::encode(p.signature));
        }
        _ => unreachable!(),
    }

    Ok(())
}

/// Helper to read input files where required
async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided
async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
