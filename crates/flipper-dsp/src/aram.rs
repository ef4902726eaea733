//! Auxiliary RAM backing store.
//!
//! On dedicated-memory systems ARAM is a 16 MiB buffer reachable only through
//! this interface. In unified-memory mode the store aliases an
//! externally-owned extended-memory pool instead; that pool is shared with
//! its owner and excluded from this device's snapshots.

use std::cell::RefCell;
use std::rc::Rc;

/// Dedicated ARAM size (16 MiB).
pub const ARAM_SIZE: u32 = 0x0100_0000;
pub const ARAM_MASK: u32 = ARAM_SIZE - 1;

enum Backing {
    Owned(Vec<u8>),
    Shared(Rc<RefCell<Vec<u8>>>),
}

pub struct AramStore {
    backing: Backing,
    size: u32,
    mask: u32,
}

impl AramStore {
    /// Dedicated, device-owned buffer.
    pub fn dedicated() -> Self {
        Self {
            backing: Backing::Owned(vec![0; ARAM_SIZE as usize]),
            size: ARAM_SIZE,
            mask: ARAM_MASK,
        }
    }

    /// Aliases an externally-owned unified-memory pool. The pool length must
    /// be a power of two.
    pub fn unified(pool: Rc<RefCell<Vec<u8>>>) -> Self {
        let size = pool.borrow().len() as u32;
        assert!(
            size.is_power_of_two(),
            "unified-memory pool size must be a power of two, got {size:#x}"
        );
        Self {
            backing: Backing::Shared(pool),
            size,
            mask: size - 1,
        }
    }

    pub fn is_unified(&self) -> bool {
        matches!(self.backing, Backing::Shared(_))
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.backing {
            Backing::Owned(bytes) => f(bytes),
            Backing::Shared(pool) => f(&pool.borrow()),
        }
    }

    fn with_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        match &mut self.backing {
            Backing::Owned(bytes) => f(bytes),
            Backing::Shared(pool) => f(&mut pool.borrow_mut()),
        }
    }

    pub fn read_u8(&self, addr: u32) -> u8 {
        self.with(|bytes| bytes[(addr & self.mask) as usize])
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) {
        let mask = self.mask;
        self.with_mut(|bytes| bytes[(addr & mask) as usize] = value);
    }

    /// Reads one 8-byte granule, little-endian store layout. Wraps modulo the
    /// store size byte-by-byte.
    pub fn read_u64(&self, addr: u32) -> u64 {
        self.with(|bytes| {
            let mut buf = [0u8; 8];
            for (i, b) in buf.iter_mut().enumerate() {
                *b = bytes[(addr.wrapping_add(i as u32) & self.mask) as usize];
            }
            u64::from_le_bytes(buf)
        })
    }

    /// Writes one 8-byte granule, little-endian store layout.
    pub fn write_u64(&mut self, addr: u32, value: u64) {
        let mask = self.mask;
        self.with_mut(|bytes| {
            for (i, b) in value.to_le_bytes().iter().enumerate() {
                bytes[(addr.wrapping_add(i as u32) & mask) as usize] = *b;
            }
        });
    }

    /// Full contents for snapshotting; `None` when the backing memory is
    /// externally owned (the owner serializes it).
    pub fn snapshot_bytes(&self) -> Option<Vec<u8>> {
        match &self.backing {
            Backing::Owned(bytes) => Some(bytes.clone()),
            Backing::Shared(_) => None,
        }
    }

    /// Restores dedicated-buffer contents. Fails on a size mismatch or when
    /// the store is aliased (shape mismatch between snapshot and live store).
    pub fn restore_bytes(&mut self, data: &[u8]) -> Result<(), ()> {
        match &mut self.backing {
            Backing::Owned(bytes) if bytes.len() == data.len() => {
                bytes.copy_from_slice(data);
                Ok(())
            }
            _ => Err(()),
        }
    }
}
