// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use crate::{Address, Cell, CellError, MAX_BITS, MAX_REFS};

/// Bit-level builder for ordinary cells
///
/// Store methods check capacity before writing, a failed store leaves
/// the builder unchanged.
#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of data bits still available
    pub fn available_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    /// Number of references still available
    pub fn available_refs(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    fn reserve(&self, bits: usize) -> Result<(), CellError> {
        match bits > self.available_bits() {
            true => Err(CellError::BitOverflow),
            false => Ok(()),
        }
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Store a single bit
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.reserve(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store an unsigned integer using `bits` bits, big-endian
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CellError::ValueOutOfRange(bits));
        }
        self.reserve(bits)?;

        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }

        Ok(self)
    }

    /// Store a signed 8-bit integer
    pub fn store_i8(&mut self, value: i8) -> Result<&mut Self, CellError> {
        self.store_uint(value as u8 as u128, 8)
    }

    /// Store raw bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.reserve(bytes.len() * 8)?;

        if self.bit_len % 8 == 0 {
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
            return Ok(self);
        }

        for b in bytes {
            for i in (0..8).rev() {
                self.push_bit((b >> i) & 1 == 1);
            }
        }

        Ok(self)
    }

    /// Store a coin amount (`VarUInteger 16`: 4-bit byte length then value)
    pub fn store_coins(&mut self, value: u128) -> Result<&mut Self, CellError> {
        let len = (128 - value.leading_zeros() as usize + 7) / 8;
        if len > 15 {
            return Err(CellError::ValueOutOfRange(120));
        }
        self.reserve(4 + len * 8)?;

        self.store_uint(len as u128, 4)?;
        self.store_uint(value, len * 8)
    }

    /// Store an optional standard address (`addr_none` when absent)
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self, CellError> {
        let a = match address {
            Some(a) => a,
            None => return self.store_uint(0b00, 2),
        };

        self.reserve(3 + 8 + 256)?;

        // addr_std$10, no anycast
        self.store_uint(0b100, 3)?;
        self.store_i8(a.workchain)?;
        self.store_bytes(&a.hash)
    }

    /// Store a reference to a child cell
    pub fn store_ref(&mut self, cell: impl Into<Arc<Cell>>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell.into());
        Ok(self)
    }

    /// Store an optional reference as a presence bit followed by the reference
    pub fn store_maybe_ref(&mut self, cell: Option<&Cell>) -> Result<&mut Self, CellError> {
        match cell {
            Some(c) => {
                if self.available_refs() == 0 {
                    return Err(CellError::RefOverflow);
                }
                self.store_bit(true)?;
                self.store_ref(c.clone())
            }
            None => self.store_bit(false),
        }
    }

    /// Store bytes in snake format, continuing into a chain of child cells
    pub fn store_bytes_tail(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        let n = self.available_bits() / 8;

        if bytes.len() <= n {
            return self.store_bytes(bytes);
        }

        if self.available_refs() == 0 {
            return Err(CellError::RefOverflow);
        }

        let mut tail = CellBuilder::new();
        tail.store_bytes_tail(&bytes[n..])?;
        let tail = tail.build()?;

        self.store_bytes(&bytes[..n])?;
        self.store_ref(tail)
    }

    /// Store a string in snake format
    pub fn store_string_tail(&mut self, s: &str) -> Result<&mut Self, CellError> {
        self.store_bytes_tail(s.as_bytes())
    }

    /// Append the bits and references of an existing cell
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self, CellError> {
        self.reserve(cell.bit_len())?;
        if cell.refs().len() > self.available_refs() {
            return Err(CellError::RefOverflow);
        }

        for i in 0..cell.bit_len() {
            self.push_bit(cell.data()[i / 8] & (0x80 >> (i % 8)) != 0);
        }
        self.refs.extend(cell.refs().iter().cloned());

        Ok(self)
    }

    /// Finalise the builder into an immutable [Cell]
    pub fn build(self) -> Result<Cell, CellError> {
        Cell::new(self.data, self.bit_len, self.refs)
    }
}
