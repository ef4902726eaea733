//! Register offsets and bit layout of the audio/DSP interface.
//!
//! All registers are 16 bits wide on a 2-byte dispatch granularity; a 32-bit
//! access is exactly two 16-bit accesses in address order. Packed registers
//! are plain integers with explicit mask/shift constants.

/// Mailbox to the DSP core, high half.
pub const REG_MAIL_TO_DSP_HI: u32 = 0x5000;
/// Mailbox to the DSP core, low half.
pub const REG_MAIL_TO_DSP_LO: u32 = 0x5002;
/// Mailbox from the DSP core, high half (read-only).
pub const REG_MAIL_FROM_DSP_HI: u32 = 0x5004;
/// Mailbox from the DSP core, low half (read-only).
pub const REG_MAIL_FROM_DSP_LO: u32 = 0x5006;
/// Control/status register shared by the three interrupt sources.
pub const REG_CONTROL: u32 = 0x500A;
/// ARAM addressing-info register; the low 4 bits select the DMA data layout.
pub const REG_ARAM_INFO: u32 = 0x5012;
/// ARAM controller status; bit 0 reads 1 once the controller has initialized.
pub const REG_ARAM_MODE: u32 = 0x5016;
/// ARAM refresh-rate register.
pub const REG_ARAM_REFRESH: u32 = 0x501A;
pub const REG_ARAM_DMA_MAIN_HI: u32 = 0x5020;
pub const REG_ARAM_DMA_MAIN_LO: u32 = 0x5022;
pub const REG_ARAM_DMA_ARAM_HI: u32 = 0x5024;
pub const REG_ARAM_DMA_ARAM_LO: u32 = 0x5026;
pub const REG_ARAM_DMA_COUNT_HI: u32 = 0x5028;
/// Writing the count low half triggers the ARAM DMA transfer.
pub const REG_ARAM_DMA_COUNT_LO: u32 = 0x502A;
pub const REG_AUDIO_DMA_START_HI: u32 = 0x5030;
pub const REG_AUDIO_DMA_START_LO: u32 = 0x5032;
/// Audio DMA block count + enable bit; a 0->1 enable edge starts the stream.
pub const REG_AUDIO_DMA_CONTROL: u32 = 0x5036;
/// Read-only; reports `max(remaining_blocks - 1, 0)`.
pub const REG_AUDIO_DMA_BLOCKS_LEFT: u32 = 0x503A;

// Control register bit layout. Each interrupt source has a sticky pending
// bit with its enable bit directly to the left.
pub const CTRL_RESET: u16 = 1 << 0;
pub const CTRL_ASSERT_INT: u16 = 1 << 1;
pub const CTRL_HALT: u16 = 1 << 2;
pub const INT_AUDIO: u16 = 1 << 3;
pub const INT_AUDIO_ENABLE: u16 = 1 << 4;
pub const INT_ARAM: u16 = 1 << 5;
pub const INT_ARAM_ENABLE: u16 = 1 << 6;
pub const INT_DSP: u16 = 1 << 7;
pub const INT_DSP_ENABLE: u16 = 1 << 8;
/// Read-only ARAM DMA in-flight status.
pub const CTRL_DMA_ACTIVE: u16 = 1 << 9;
pub const CTRL_INIT_CODE: u16 = 1 << 10;
pub const CTRL_INIT: u16 = 1 << 11;
pub const CTRL_PAD_MASK: u16 = 0xF000;

/// All sticky interrupt-pending bits.
pub const INT_PENDING_MASK: u16 = INT_AUDIO | INT_ARAM | INT_DSP;

/// Control bits owned by the DSP execution core (reset/assert-int/halt plus
/// the two init flags). Reads merge the core's view under this mask; writes
/// forward the value to the core and adopt what it returns.
pub const CTRL_CORE_MASK: u16 =
    CTRL_RESET | CTRL_ASSERT_INT | CTRL_HALT | CTRL_INIT_CODE | CTRL_INIT;

// Write masks. Unimplemented bits are discarded on write.
pub const WMASK_ARAM_INFO: u16 = 0x007F;
pub const WMASK_ARAM_REFRESH: u16 = 0x07FF;
pub const WMASK_ADDR_HI: u16 = 0x03FF;
/// Audio DMA source high-half mask in unified-memory mode.
pub const WMASK_ADDR_HI_UNIFIED: u16 = 0x1FFF;
/// Low halves of DMA addresses and counts are 32-byte aligned.
pub const WMASK_ADDR_LO: u16 = 0xFFE0;
/// ARAM DMA count high half additionally carries the direction bit.
pub const WMASK_COUNT_DIR: u16 = 0x8000;

/// Computes the CPU interrupt line level from a control word: asserted iff
/// some source has pending and enable both set. Shifting right by one aligns
/// each enable bit with its pending bit.
pub fn interrupt_line_level(control: u16) -> bool {
    (control >> 1) & control & INT_PENDING_MASK != 0
}
