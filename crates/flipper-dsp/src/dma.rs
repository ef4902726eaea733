//! Register state of the two DMA engines.
//!
//! The engines' transfer/scheduling logic lives in [`crate::interface`];
//! these types hold the register-visible words and their field accessors.

/// Audio DMA blocks are 32 bytes: 8 stereo frames of 16-bit PCM.
pub const AUDIO_BLOCK_BYTES: u32 = 32;
/// Stereo frames per audio block.
pub const FRAMES_PER_BLOCK: u32 = 8;

pub const AUDIO_DMA_ENABLE: u16 = 1 << 15;
pub const AUDIO_DMA_BLOCKS_MASK: u16 = 0x7FFF;

/// ARAM DMA moves 8 bytes per loop iteration.
pub const DMA_GRANULE_BYTES: u32 = 8;
/// Virtual cycles per 32 transferred bytes, measured on real hardware.
pub const ARAM_DMA_CYCLES_PER_32_BYTES: u64 = 246;
/// DMA addresses wrap every 64 MiB (unconnected upper address lines).
pub const DMA_ADDRESS_WRAP_MASK: u32 = 0x03FF_FFFF;

pub const ARAM_DMA_DIRECTION_BIT: u32 = 1 << 31;
pub const ARAM_DMA_COUNT_MASK: u32 = !ARAM_DMA_DIRECTION_BIT;

/// Periodic streaming DMA feeding the audio sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioDma {
    /// Base source address; new values take effect at the next reload while
    /// the engine is running.
    pub source_address: u32,
    /// Block count (bits 0..15) and enable (bit 15).
    pub control: u16,
    /// Running source cursor, latched from `source_address` on start/reload.
    pub current_source_address: u32,
    /// Blocks left in the current pass.
    pub remaining_blocks: u16,
}

impl AudioDma {
    pub fn enabled(&self) -> bool {
        self.control & AUDIO_DMA_ENABLE != 0
    }

    pub fn num_blocks(&self) -> u16 {
        self.control & AUDIO_DMA_BLOCKS_MASK
    }

    /// Register read-back of the blocks-left counter. The count is reported
    /// zero-based and must reach exactly 0; consumers busy-wait on it.
    pub fn blocks_left_readback(&self) -> u16 {
        self.remaining_blocks.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    MainToAram,
    AramToMain,
}

/// One-shot bulk DMA between main memory and the ARAM store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AramDma {
    pub main_addr: u32,
    pub aram_addr: u32,
    /// Byte count (bits 0..31) and direction (bit 31).
    pub count: u32,
}

impl AramDma {
    pub fn byte_count(&self) -> u32 {
        self.count & ARAM_DMA_COUNT_MASK
    }

    pub fn direction(&self) -> DmaDirection {
        if self.count & ARAM_DMA_DIRECTION_BIT != 0 {
            DmaDirection::AramToMain
        } else {
            DmaDirection::MainToAram
        }
    }

    /// Consumes one granule's worth of count, preserving the direction bit.
    pub fn consume_granule(&mut self) {
        let bytes = self.byte_count().saturating_sub(DMA_GRANULE_BYTES);
        self.count = (self.count & ARAM_DMA_DIRECTION_BIT) | bytes;
    }
}
