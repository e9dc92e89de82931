// Copyright (c) 2022-2023 The MobileCoin Foundation

//! APDU exchange helpers and the chunked transfer state machine
//!
//! A chunked transfer runs as:
//!
//! ```text
//! Idle -> PathDeclared -> [ChunkSent]* -> FinalSent -> ResponseReceived
//! ```
//!
//! Any failure aborts the transfer, the caller restarts from `Idle`.

use std::fmt::{Debug, Display};

use ledger_apdu::{APDUCommand, APDUErrorCode};
use ledger_transport::Exchange;
use log::{debug, trace};

use ledger_ton_apdu::{
    chunks, path::DerivationPath, raw_command, ApduError, ChunkP2, Instruction, LegacyP1,
    CHUNK_SIZE,
};

use crate::Error;

/// Issue a single APDU, returning response data with the status word stripped
pub(crate) async fn exchange<T>(t: &T, cmd: &APDUCommand<Vec<u8>>) -> Result<Vec<u8>, Error<T::Error>>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    trace!(
        "tx: {:02x} {:02x} {:02x} {:02x} [{}] {}",
        cmd.cla,
        cmd.ins,
        cmd.p1,
        cmd.p2,
        cmd.data.len(),
        hex::encode(&cmd.data)
    );

    let resp = t.exchange(cmd).await.map_err(Error::Transport)?;

    match resp.error_code() {
        Ok(APDUErrorCode::NoError) => (),
        Ok(c) => return Err(Error::Status(c as u16)),
        Err(c) => return Err(Error::Status(c)),
    }

    let data = resp.data().to_vec();
    trace!("rx: {}", hex::encode(&data));

    Ok(data)
}

/// Chunked transfer state
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ExchangeState {
    Idle,
    PathDeclared,
    ChunkSent(usize),
    FinalSent,
    ResponseReceived,
}

/// Chunked transfer of a request body to the device
pub(crate) struct ChunkedExchange<'a, T> {
    t: &'a T,
    ins: Instruction,
    state: ExchangeState,
}

impl<'a, T> ChunkedExchange<'a, T>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    /// Start a chunked transfer for the provided instruction
    pub fn new(t: &'a T, ins: Instruction) -> Self {
        Self {
            t,
            ins,
            state: ExchangeState::Idle,
        }
    }

    fn transition(&mut self, next: ExchangeState) {
        debug!("{} exchange: {} -> {}", self.ins, self.state, next);
        self.state = next;
    }

    /// Open the transfer by declaring the derivation path
    pub async fn declare_path(&mut self, path: &DerivationPath) -> Result<(), Error<T::Error>> {
        if self.state != ExchangeState::Idle {
            return Err(Error::InvalidState(self.state, ExchangeState::Idle));
        }

        let cmd = raw_command(self.ins, 0x00, ChunkP2::Start as u8, &path.to_bytes());
        exchange(self.t, &cmd).await?;

        self.transition(ExchangeState::PathDeclared);
        Ok(())
    }

    /// Send an intermediate chunk
    pub async fn send_chunk(&mut self, chunk: &[u8]) -> Result<(), Error<T::Error>> {
        let n = match self.state {
            ExchangeState::PathDeclared => 0,
            ExchangeState::ChunkSent(n) => n,
            s => return Err(Error::InvalidState(s, ExchangeState::PathDeclared)),
        };

        let cmd = raw_command(self.ins, 0x00, ChunkP2::More as u8, chunk);
        exchange(self.t, &cmd).await?;

        self.transition(ExchangeState::ChunkSent(n + 1));
        Ok(())
    }

    /// Send the final chunk, returning the device response
    pub async fn send_final(&mut self, chunk: &[u8]) -> Result<Vec<u8>, Error<T::Error>> {
        match self.state {
            ExchangeState::PathDeclared | ExchangeState::ChunkSent(_) => (),
            s => return Err(Error::InvalidState(s, ExchangeState::PathDeclared)),
        }

        let cmd = raw_command(self.ins, 0x00, ChunkP2::Final as u8, chunk);
        self.transition(ExchangeState::FinalSent);

        let resp = exchange(self.t, &cmd).await?;
        self.transition(ExchangeState::ResponseReceived);

        Ok(resp)
    }

    /// Run a complete transfer: declare path, stream chunks, fetch response
    pub async fn run(
        mut self,
        path: &DerivationPath,
        body: &[u8],
    ) -> Result<Vec<u8>, Error<T::Error>> {
        self.declare_path(path).await?;

        let c = chunks(body);
        let (last, rest) = match c.split_last() {
            Some(v) => v,
            None => return Err(Error::Encoding(ApduError::InvalidLength)),
        };

        for chunk in rest {
            self.send_chunk(chunk).await?;
        }

        self.send_final(last).await
    }
}

/// Single-shot signing for legacy firmware, path then complete body
pub(crate) async fn single_shot<T>(
    t: &T,
    ins: Instruction,
    path: &DerivationPath,
    body: &[u8],
) -> Result<Vec<u8>, Error<T::Error>>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    if body.len() > CHUNK_SIZE {
        return Err(Error::Encoding(ApduError::InvalidLength));
    }

    debug!("{} single-shot: declaring path", ins);
    let cmd = raw_command(ins, LegacyP1::Path as u8, 0x00, &path.to_bytes());
    exchange(t, &cmd).await?;

    debug!("{} single-shot: sending {} byte request", ins, body.len());
    let cmd = raw_command(ins, LegacyP1::Payload as u8, 0x00, body);
    exchange(t, &cmd).await
}

#[cfg(test)]
mod test {
    use std::{ops::Deref, sync::Mutex};

    use async_trait::async_trait;
    use ledger_apdu::APDUAnswer;

    use super::*;

    /// Accepts every command, recording `P2` values
    #[derive(Default)]
    struct Accept {
        p2: Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl Exchange for Accept {
        type Error = std::io::Error;
        type AnswerType = Vec<u8>;

        async fn exchange<I>(
            &self,
            command: &APDUCommand<I>,
        ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
        where
            I: Deref<Target = [u8]> + Send + Sync,
        {
            self.p2.lock().unwrap().push(command.p2);

            APDUAnswer::from_answer(vec![0xaa, 0x90, 0x00])
                .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidData))
        }
    }

    fn path() -> DerivationPath {
        DerivationPath::wallet(0, 0).unwrap()
    }

    #[tokio::test]
    async fn chunked_stages() {
        let t = Accept::default();

        let resp = ChunkedExchange::new(&t, Instruction::SignTx)
            .run(&path(), &[0u8; 600])
            .await
            .unwrap();

        assert_eq!(resp, vec![0xaa]);
        assert_eq!(*t.p2.lock().unwrap(), vec![0x03, 0x02, 0x02, 0x00]);
    }

    #[tokio::test]
    async fn invalid_transitions() {
        let t = Accept::default();
        let mut x = ChunkedExchange::new(&t, Instruction::SignData);

        assert!(matches!(
            x.send_final(&[]).await,
            Err(Error::InvalidState(ExchangeState::Idle, _))
        ));

        x.declare_path(&path()).await.unwrap();
        x.send_chunk(&[1]).await.unwrap();
        assert_eq!(x.state, ExchangeState::ChunkSent(1));

        x.send_final(&[2]).await.unwrap();
        assert_eq!(x.state, ExchangeState::ResponseReceived);

        assert!(matches!(
            x.declare_path(&path()).await,
            Err(Error::InvalidState(ExchangeState::ResponseReceived, _))
        ));

        // Nothing is sent for rejected transitions
        assert_eq!(t.p2.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn single_shot_limits() {
        let t = Accept::default();

        let r = single_shot(&t, Instruction::SignTx, &path(), &[0u8; 256]).await;
        assert!(matches!(r, Err(Error::Encoding(ApduError::InvalidLength))));
        assert!(t.p2.lock().unwrap().is_empty());

        let r = single_shot(&t, Instruction::SignTx, &path(), &[0u8; 255]).await;
        assert_eq!(r.unwrap(), vec![0xaa]);
    }
}
