// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::CellError;

/// Maximum number of data bits in a cell
pub const MAX_BITS: usize = 1023;

/// Maximum number of references in a cell
pub const MAX_REFS: usize = 4;

/// Maximum depth of a cell tree
pub const MAX_DEPTH: u16 = 1024;

/// Tree node interface used by protocol encoders, allowing references
/// to be communicated by depth and hash without transmitting the tree.
pub trait TreeNode {
    /// Representation hash of the node
    fn hash(&self) -> [u8; 32];

    /// Maximum reference chain length below this node
    fn depth(&self) -> u16;
}

/// Immutable ordinary cell
///
/// Hash and depth are computed once on construction, cells are then
/// identified by their hash.
#[derive(Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Create a cell from packed data bits and references
    pub(crate) fn new(
        mut data: Vec<u8>,
        bit_len: usize,
        refs: Vec<Arc<Cell>>,
    ) -> Result<Self, CellError> {
        if bit_len > MAX_BITS {
            return Err(CellError::BitOverflow);
        }
        if refs.len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }

        let n = (bit_len + 7) / 8;
        if data.len() < n {
            return Err(CellError::InvalidBoc("cell data shorter than bit length"));
        }
        data.truncate(n);

        // Bits past the end of the cell are always zero
        if bit_len % 8 != 0 {
            data[n - 1] &= 0xffu8 << (8 - bit_len % 8);
        }

        let depth = match refs.iter().map(|r| r.depth).max() {
            Some(d) if d >= MAX_DEPTH => return Err(CellError::DepthOverflow),
            Some(d) => d + 1,
            None => 0,
        };

        let mut c = Self {
            data,
            bit_len,
            refs,
            hash: [0u8; 32],
            depth,
        };
        c.hash = c.compute_hash();

        Ok(c)
    }

    /// Create an empty cell (no bits, no references)
    pub fn empty() -> Self {
        let mut c = Self {
            data: vec![],
            bit_len: 0,
            refs: vec![],
            hash: [0u8; 32],
            depth: 0,
        };
        c.hash = c.compute_hash();
        c
    }

    /// Number of data bits
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Packed data bytes (trailing bits zeroed)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child references
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Fetch the data bit at the provided index
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some(self.data[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Cell descriptor bytes `d1` and `d2` for an ordinary level-0 cell
    pub(crate) fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8;
        [d1, d2]
    }

    /// Data bytes with the completion tag applied to incomplete bytes
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        let mut d = self.data.clone();
        let rem = self.bit_len % 8;
        if rem != 0 {
            let last = d.len() - 1;
            d[last] |= 0x80 >> rem;
        }
        d
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut h = Sha256::new();

        h.update(self.descriptors());
        h.update(self.padded_data());

        for r in &self.refs {
            h.update(r.depth.to_be_bytes());
        }
        for r in &self.refs {
            h.update(r.hash);
        }

        h.finalize().into()
    }
}

impl TreeNode for Cell {
    fn hash(&self) -> [u8; 32] {
        self.hash
    }

    fn depth(&self) -> u16 {
        self.depth
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// Cells are compared by representation hash
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl core::fmt::Debug for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Cell{{bits: {}, data: {}, refs: {}, hash: {}}}",
            self.bit_len,
            hex::encode(&self.data),
            self.refs.len(),
            hex::encode(self.hash)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::CellBuilder;

    #[test]
    fn empty_cell_hash() {
        let c = Cell::empty();

        assert_eq!(
            hex::encode(c.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(c.depth(), 0);
    }

    #[test]
    fn padding_and_descriptors() {
        let mut b = CellBuilder::new();
        b.store_bit(true).unwrap();
        let c = b.build().unwrap();

        assert_eq!(c.descriptors(), [0x00, 0x01]);
        assert_eq!(c.padded_data(), vec![0xc0]);

        let mut b = CellBuilder::new();
        b.store_uint(0xab, 8).unwrap();
        let c = b.build().unwrap();

        assert_eq!(c.descriptors(), [0x00, 0x02]);
        assert_eq!(c.padded_data(), vec![0xab]);
    }

    #[test]
    fn depth_tracks_longest_chain() {
        let leaf = Cell::empty();

        let mut b = CellBuilder::new();
        b.store_ref(leaf.clone()).unwrap();
        let mid = b.build().unwrap();

        let mut b = CellBuilder::new();
        b.store_ref(leaf).unwrap();
        b.store_ref(mid.clone()).unwrap();
        let root = b.build().unwrap();

        assert_eq!(mid.depth(), 1);
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn hash_depends_on_refs() {
        let mut a = CellBuilder::new();
        a.store_uint(1, 8).unwrap();
        let a = a.build().unwrap();

        let mut b = CellBuilder::new();
        b.store_uint(1, 8).unwrap();
        b.store_ref(Cell::empty()).unwrap();
        let b = b.build().unwrap();

        assert_ne!(a.hash(), b.hash());
        assert_ne!(a, b);
    }
}
