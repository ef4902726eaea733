//! Guest main-memory access for the console device models.
//!
//! The emulated CPU bus is big-endian, so all multi-byte accessors here are
//! big-endian. DMA engines are defined never to fault at the bus level:
//! implementations mask addresses into range instead of rejecting them.

#![forbid(unsafe_code)]

/// Abstraction over guest main memory as seen by DMA engines.
///
/// Reads take `&self`; main RAM has no read side effects in this model.
pub trait MainBus {
    /// Reads `dst.len()` bytes starting at `addr`.
    fn read(&self, addr: u32, dst: &mut [u8]);

    /// Writes `src` starting at `addr`.
    fn write(&mut self, addr: u32, src: &[u8]);

    fn read_u16(&self, addr: u32) -> u16 {
        let mut buf = [0u8; 2];
        self.read(addr, &mut buf);
        u16::from_be_bytes(buf)
    }

    fn read_u64(&self, addr: u32) -> u64 {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf);
        u64::from_be_bytes(buf)
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        self.write(addr, &value.to_be_bytes());
    }

    fn write_u64(&mut self, addr: u32, value: u64) {
        self.write(addr, &value.to_be_bytes());
    }
}

/// Flat power-of-two-sized RAM backing.
///
/// Addresses wrap modulo the size, modeling unconnected upper address lines;
/// accesses that straddle the top of RAM wrap back to zero byte-by-byte.
pub struct Ram {
    bytes: Vec<u8>,
    mask: u32,
}

impl Ram {
    /// `size` must be a power of two.
    pub fn new(size: u32) -> Self {
        assert!(
            size.is_power_of_two(),
            "RAM size must be a power of two, got {size:#x}"
        );
        Self {
            bytes: vec![0; size as usize],
            mask: size - 1,
        }
    }

    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl MainBus for Ram {
    fn read(&self, addr: u32, dst: &mut [u8]) {
        for (i, b) in dst.iter_mut().enumerate() {
            *b = self.bytes[(addr.wrapping_add(i as u32) & self.mask) as usize];
        }
    }

    fn write(&mut self, addr: u32, src: &[u8]) {
        for (i, b) in src.iter().enumerate() {
            self.bytes[(addr.wrapping_add(i as u32) & self.mask) as usize] = *b;
        }
    }
}
