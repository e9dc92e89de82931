// Copyright (c) 2022-2023 The MobileCoin Foundation

use ed25519_dalek::Signature;

use ledger_ton::{
    apdu::{
        flags::{AddressOptions, Protocol},
        sign_data::SignDataRequest,
        ApduError,
    },
    cell::TreeNode,
    Error, ProofParams, SignDataOptions,
};

mod helpers;
use helpers::*;

const TIMESTAMP: u64 = 1_700_000_000;

#[tokio::test]
async fn sign_plaintext() -> anyhow::Result<()> {
    setup_logging();

    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    let req = SignDataRequest::plaintext("hello ton");
    let e = req.encode()?;
    d.expect_data(&e.request(TIMESTAMP), e.cell.hash(), e.hash(TIMESTAMP));

    let opts = SignDataOptions {
        timestamp: Some(TIMESTAMP),
    };
    let s = h.sign_data(PATH, &req, &opts).await?;

    assert_eq!(s.timestamp, TIMESTAMP);
    assert_eq!(s.hash, e.hash(TIMESTAMP));
    assert_eq!(s.cell.hash(), e.cell.hash());
    d.public_key()
        .verify_strict(&s.hash, &Signature::from_bytes(&s.signature))?;

    // Path declaration then chunked body
    let log: Vec<_> = d
        .log()
        .iter()
        .filter(|a| a.ins == 0x09)
        .map(|a| a.p2)
        .collect();
    assert_eq!(log.first(), Some(&0x03));
    assert_eq!(log.last(), Some(&0x00));

    Ok(())
}

#[tokio::test]
async fn sign_data_hash_mismatch() -> anyhow::Result<()> {
    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    // No expectation set, device signs a hash of the raw request
    let r = h
        .sign_data(
            PATH,
            &SignDataRequest::plaintext("hello"),
            &SignDataOptions {
                timestamp: Some(TIMESTAMP),
            },
        )
        .await;
    assert!(matches!(r, Err(Error::HashMismatch { .. })));

    Ok(())
}

#[tokio::test]
async fn sign_data_envelope_reported() -> anyhow::Result<()> {
    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    // Envelope hash reported in place of the cell hash
    let req = SignDataRequest::plaintext("hello ton");
    let e = req.encode()?;
    d.expect(&e.request(TIMESTAMP), e.hash(TIMESTAMP));

    let opts = SignDataOptions {
        timestamp: Some(TIMESTAMP),
    };
    match h.sign_data(PATH, &req, &opts).await {
        Err(Error::HashMismatch { expected, actual }) => {
            assert_eq!(expected, e.cell.hash());
            assert_eq!(actual, e.hash(TIMESTAMP));
        }
        r => panic!("unexpected result: {r:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn sign_data_wrong_envelope() -> anyhow::Result<()> {
    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    // Correct cell hash, signature over another timestamp's envelope
    let req = SignDataRequest::plaintext("hello ton");
    let e = req.encode()?;
    d.expect_data(&e.request(TIMESTAMP), e.cell.hash(), e.hash(TIMESTAMP + 1));

    let opts = SignDataOptions {
        timestamp: Some(TIMESTAMP),
    };
    let r = h.sign_data(PATH, &req, &opts).await;
    assert!(matches!(r, Err(Error::InvalidSignature)));

    Ok(())
}

#[tokio::test]
async fn sign_data_non_ascii() {
    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    let r = h.sign_message(PATH, "héllo").await;
    assert!(matches!(r, Err(Error::Encoding(ApduError::NonAsciiText))));
    assert!(d.log().is_empty());
}

#[tokio::test]
async fn address_proof() -> anyhow::Result<()> {
    setup_logging();

    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    let params = ProofParams {
        domain: "example.com".to_string(),
        timestamp: TIMESTAMP,
        payload: b"challenge".to_vec(),
    };

    let p = h
        .get_address_proof(PATH, &params, &AddressOptions::default())
        .await?;

    d.public_key()
        .verify_strict(&p.hash, &Signature::from_bytes(&p.signature))?;

    let log = d.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].ins, 0x05);
    assert_eq!((log[1].ins, log[1].p1), (0x08, 0x01));

    // Flags, path, domain, timestamp, payload
    let data = &log[1].data;
    assert_eq!(data.len(), 1 + 25 + 1 + 11 + 8 + 9);
    assert_eq!(data[26], 11);
    assert_eq!(&data[27..38], b"example.com");
    assert_eq!(&data[38..46], &TIMESTAMP.to_be_bytes());
    assert_eq!(&data[46..], b"challenge");

    Ok(())
}

#[tokio::test]
async fn address_proof_oversized() {
    let d = MockDevice::new(MockState::default());
    let h = d.handle(Protocol::Current);

    let params = ProofParams {
        domain: "example.com".to_string(),
        timestamp: TIMESTAMP,
        payload: vec![0xaa; 256],
    };

    let r = h
        .get_address_proof(PATH, &params, &AddressOptions::default())
        .await;
    assert!(matches!(r, Err(Error::Encoding(ApduError::InvalidLength))));
    assert!(d.log().is_empty());
}
