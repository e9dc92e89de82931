// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TON cell primitives for the Ledger TON interface
//!
//! Cells are immutable, content-addressed tree nodes holding up to 1023 bits
//! of data and up to four references to child cells. This crate provides the
//! subset of the TON cell model required by the hardware wallet protocol:
//!
//! - [CellBuilder] for bit-level construction of ordinary cells
//! - [Cell] with representation [hash][TreeNode::hash] and [depth][TreeNode::depth]
//! - [Address] with raw and user-friendly string forms
//! - [StateInit] for contract deployment data
//! - [boc] bag-of-cells serialisation for transporting cell trees
//!
//! Protocol encoders depend only on [CellBuilder] and the [TreeNode]
//! interface, so any conforming cell implementation may be substituted.

mod address;
pub use address::{Address, FriendlyAddress};

mod builder;
pub use builder::CellBuilder;

mod cell;
pub use cell::{Cell, TreeNode, MAX_BITS, MAX_DEPTH, MAX_REFS};

mod state_init;
pub use state_init::StateInit;

pub mod boc;

/// Cell construction and decoding errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CellError {
    /// Cell data exceeds 1023 bits
    #[error("cell bit capacity exceeded")]
    BitOverflow,

    /// Cell has more than four references
    #[error("cell reference capacity exceeded")]
    RefOverflow,

    /// Cell tree exceeds maximum depth
    #[error("cell depth limit exceeded")]
    DepthOverflow,

    /// Value does not fit the requested field width
    #[error("value out of range for {0}-bit field")]
    ValueOutOfRange(usize),

    /// Workchain does not fit a standard address
    #[error("invalid workchain: {0}")]
    InvalidWorkchain(i32),

    /// Address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    /// Address checksum mismatch
    #[error("address checksum mismatch")]
    InvalidChecksum,

    /// Malformed bag-of-cells
    #[error("invalid bag of cells: {0}")]
    InvalidBoc(&'static str),

    /// Unsupported cell or bag-of-cells feature
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}
