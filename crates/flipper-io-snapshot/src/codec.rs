//! Nested field encoding helpers.
//!
//! Composite snapshot fields (a DMA block, a register file) are packed with
//! [`Encoder`] into a plain little-endian byte string and stored under a
//! single TLV tag; [`Decoder`] unpacks them with strict bounds and
//! trailing-byte checks.

use crate::{SnapshotError, SnapshotResult};

#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.buf.push(value as u8);
        self
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct Decoder<'a> {
    rest: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    fn take<const N: usize>(&mut self) -> SnapshotResult<[u8; N]> {
        if self.rest.len() < N {
            return Err(SnapshotError::Corrupt("nested field underrun"));
        }
        let (head, rest) = self.rest.split_at(N);
        self.rest = rest;
        Ok(head.try_into().unwrap())
    }

    pub fn bool(&mut self) -> SnapshotResult<bool> {
        Ok(self.take::<1>()?[0] != 0)
    }

    pub fn u8(&mut self) -> SnapshotResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn u16(&mut self) -> SnapshotResult<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    pub fn u32(&mut self) -> SnapshotResult<u32> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    pub fn u64(&mut self) -> SnapshotResult<u64> {
        Ok(u64::from_le_bytes(self.take::<8>()?))
    }

    /// Fails unless every byte of the nested field has been consumed.
    pub fn finish(self) -> SnapshotResult<()> {
        if !self.rest.is_empty() {
            return Err(SnapshotError::Corrupt("nested field has trailing bytes"));
        }
        Ok(())
    }
}
