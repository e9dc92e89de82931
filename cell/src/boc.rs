// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bag-of-cells serialisation
//!
//! ## Encoding
//!
//! ```text
//! +--------+-------+-----------+-----------------+----------------+
//! | MAGIC  | FLAGS | OFF_BYTES | CELLS/ROOTS/ABS | TOT_CELLS_SIZE |
//! | 4-byte | 1     | 1         | SIZE bytes each | OFF_BYTES      |
//! +--------+-------+-----------+-----------------+----------------+
//! | ROOT INDEXES | [INDEX] | CELL DATA ... | [CRC32C, LE]         |
//! +--------------+---------+---------------+----------------------+
//! ```
//!
//! Cells are written parents-first so every reference index is greater
//! than the index of the referring cell.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::trace;

use crate::{Cell, CellError, TreeNode, MAX_REFS};

/// Generic bag-of-cells magic
pub const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

const FLAG_HAS_INDEX: u8 = 1 << 7;
const FLAG_HAS_CRC32C: u8 = 1 << 6;
const FLAG_HAS_CACHE_BITS: u8 = 1 << 5;
const SIZE_MASK: u8 = 0x07;

const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

/// Serialise a single-root cell tree
pub fn serialize(root: &Cell, with_crc: bool) -> Vec<u8> {
    let order = topo_order(root);

    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash(), i))
        .collect();

    let size_bytes = byte_len(order.len() as u64);

    // Encode cells
    let mut cells = vec![];
    for c in &order {
        cells.extend_from_slice(&c.descriptors());
        cells.extend_from_slice(&c.padded_data());

        for r in c.refs() {
            write_uint(&mut cells, index[&r.hash()] as u64, size_bytes);
        }
    }

    let off_bytes = byte_len(cells.len() as u64);

    // Write header
    let mut b = Vec::with_capacity(cells.len() + 32);
    b.extend_from_slice(&BOC_MAGIC);

    let mut flags = size_bytes as u8;
    if with_crc {
        flags |= FLAG_HAS_CRC32C;
    }
    b.push(flags);
    b.push(off_bytes as u8);

    write_uint(&mut b, order.len() as u64, size_bytes);
    write_uint(&mut b, 1, size_bytes);
    write_uint(&mut b, 0, size_bytes);
    write_uint(&mut b, cells.len() as u64, off_bytes);
    write_uint(&mut b, 0, size_bytes);

    b.extend_from_slice(&cells);

    if with_crc {
        let crc = CRC32C.checksum(&b);
        b.extend_from_slice(&crc.to_le_bytes());
    }

    trace!("serialised {} cells ({} bytes)", order.len(), b.len());

    b
}

/// Deserialise a bag-of-cells, returning the first root
pub fn deserialize(buff: &[u8]) -> Result<Cell, CellError> {
    let mut r = Reader { buff, index: 0 };

    if r.take(4)? != &BOC_MAGIC[..] {
        return Err(CellError::InvalidBoc("invalid magic"));
    }

    let flags = r.take(1)?[0];
    let size = (flags & SIZE_MASK) as usize;
    if size == 0 || size > 4 {
        return Err(CellError::InvalidBoc("invalid reference size"));
    }
    if flags & FLAG_HAS_CACHE_BITS != 0 {
        return Err(CellError::Unsupported("cache bits"));
    }

    let off_bytes = r.take(1)?[0] as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(CellError::InvalidBoc("invalid offset size"));
    }

    let cell_count = r.uint(size)? as usize;
    let root_count = r.uint(size)? as usize;
    let _absent = r.uint(size)?;
    let total_size = r.uint(off_bytes)? as usize;

    // Bound header counts by the input before allocating
    if cell_count > buff.len() - r.index {
        return Err(CellError::InvalidBoc("cell count exceeds data"));
    }
    if root_count == 0 {
        return Err(CellError::InvalidBoc("no roots"));
    }
    if root_count > cell_count {
        return Err(CellError::InvalidBoc("more roots than cells"));
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        roots.push(r.uint(size)? as usize);
    }

    if flags & FLAG_HAS_INDEX != 0 {
        r.take(cell_count * off_bytes)?;
    }

    let cell_data = r.take(total_size)?;

    if flags & FLAG_HAS_CRC32C != 0 {
        let expected = r.take(4)?;
        let crc = CRC32C.checksum(&buff[..r.index - 4]);
        if expected != &crc.to_le_bytes()[..] {
            return Err(CellError::InvalidBoc("crc32c mismatch"));
        }
    }

    // Parse raw cells
    let mut r = Reader {
        buff: cell_data,
        index: 0,
    };
    let mut raw = Vec::with_capacity(cell_count);

    for i in 0..cell_count {
        let d = r.take(2)?;
        let (d1, d2) = (d[0], d[1]);

        if d1 & 0x08 != 0 {
            return Err(CellError::Unsupported("exotic cells"));
        }
        if d1 & 0x10 != 0 {
            return Err(CellError::Unsupported("stored hashes"));
        }

        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_REFS {
            return Err(CellError::InvalidBoc("too many references"));
        }

        let data_len = (d2 as usize + 1) / 2;
        let data = r.take(data_len)?.to_vec();

        let bit_len = match d2 % 2 {
            0 => data_len * 8,
            _ => {
                let last = data[data_len - 1];
                if last == 0 {
                    return Err(CellError::InvalidBoc("missing completion tag"));
                }
                data_len * 8 - last.trailing_zeros() as usize - 1
            }
        };

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let idx = r.uint(size)? as usize;
            if idx <= i || idx >= cell_count {
                return Err(CellError::InvalidBoc("invalid reference index"));
            }
            refs.push(idx);
        }

        raw.push((data, bit_len, refs));
    }

    // Build cells children-first
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (i, (data, bit_len, refs)) in raw.into_iter().enumerate().rev() {
        let refs = refs
            .iter()
            .map(|idx| built[*idx].clone())
            .collect::<Option<Vec<_>>>()
            .ok_or(CellError::InvalidBoc("unresolved reference"))?;

        built[i] = Some(Arc::new(Cell::new(data, bit_len, refs)?));
    }

    let root = built
        .get(roots[0])
        .cloned()
        .flatten()
        .ok_or(CellError::InvalidBoc("invalid root index"))?;

    Ok((*root).clone())
}

/// Order cells parents-first, de-duplicating by hash
fn topo_order(root: &Cell) -> Vec<&Cell> {
    fn visit<'a>(c: &'a Cell, seen: &mut HashSet<[u8; 32]>, post: &mut Vec<&'a Cell>) {
        if !seen.insert(c.hash()) {
            return;
        }
        for r in c.refs() {
            visit(r, seen, post);
        }
        post.push(c);
    }

    let mut seen = HashSet::new();
    let mut post = vec![];
    visit(root, &mut seen, &mut post);

    post.reverse();
    post
}

/// Minimum number of bytes needed to represent `v` (at least one)
fn byte_len(v: u64) -> usize {
    let bits = 64 - v.leading_zeros() as usize;
    ((bits + 7) / 8).max(1)
}

fn write_uint(buff: &mut Vec<u8>, v: u64, n: usize) {
    buff.extend_from_slice(&v.to_be_bytes()[8 - n..]);
}

struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        if self.buff.len() - self.index < n {
            return Err(CellError::InvalidBoc("unexpected end of data"));
        }
        let d = &self.buff[self.index..][..n];
        self.index += n;
        Ok(d)
    }

    fn uint(&mut self, n: usize) -> Result<u64, CellError> {
        let d = self.take(n)?;
        Ok(d.iter().fold(0u64, |a, b| (a << 8) | *b as u64))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::CellBuilder;

    fn tree() -> Cell {
        let mut leaf = CellBuilder::new();
        leaf.store_uint(0x1234, 16).unwrap();
        leaf.store_bit(true).unwrap();
        let leaf = leaf.build().unwrap();

        let mut mid = CellBuilder::new();
        mid.store_string_tail("hello").unwrap();
        mid.store_ref(leaf.clone()).unwrap();
        let mid = mid.build().unwrap();

        let mut root = CellBuilder::new();
        root.store_uint(0x0f8a7ea5, 32).unwrap();
        root.store_ref(mid).unwrap();
        root.store_ref(leaf).unwrap();
        root.build().unwrap()
    }

    #[test]
    fn empty_cell_boc() {
        let b = serialize(&Cell::empty(), false);
        assert_eq!(hex::encode(&b), "b5ee9c72010101010002000000");
    }

    #[test]
    fn tree_boc_preserves_hash() {
        let root = tree();

        for crc in [false, true] {
            let b = serialize(&root, crc);
            let decoded = deserialize(&b).unwrap();

            assert_eq!(decoded.hash(), root.hash());
            assert_eq!(decoded.depth(), root.depth());
        }
    }

    #[test]
    fn shared_cells_deduplicated() {
        // `leaf` is referenced twice but stored once
        let b = serialize(&tree(), false);
        assert_eq!(b[6], 3);
    }

    #[test]
    fn crc_mismatch_rejected() {
        let mut b = serialize(&tree(), true);
        let n = b.len();
        b[n - 1] ^= 0xff;

        assert_eq!(
            deserialize(&b).unwrap_err(),
            CellError::InvalidBoc("crc32c mismatch")
        );
    }

    #[test]
    fn truncated_boc_rejected() {
        let b = serialize(&tree(), false);
        assert!(deserialize(&b[..b.len() - 3]).is_err());
    }

    #[test]
    fn oversized_cell_count_rejected() {
        let b = hex::decode("b5ee9c720401ffffffff000000010000000000000000").unwrap();
        assert_eq!(
            deserialize(&b).unwrap_err(),
            CellError::InvalidBoc("cell count exceeds data")
        );
    }

    #[test]
    fn oversized_root_count_rejected() {
        let b = hex::decode("b5ee9c72040100000001ffffffff000000000200000000").unwrap();
        assert_eq!(
            deserialize(&b).unwrap_err(),
            CellError::InvalidBoc("more roots than cells")
        );

        // Roots beyond the cell count, within the input length
        let mut b = serialize(&Cell::empty(), false);
        b[7] = 2;
        assert_eq!(
            deserialize(&b).unwrap_err(),
            CellError::InvalidBoc("more roots than cells")
        );
    }

    #[test]
    fn oversized_total_size_rejected() {
        let b = hex::decode("b5ee9c720108010100ffffffffffffffff00").unwrap();
        assert_eq!(
            deserialize(&b).unwrap_err(),
            CellError::InvalidBoc("unexpected end of data")
        );
    }
}
