//! DSP execution core seam.
//!
//! The interface forwards mailbox half-words and core-owned control bits to
//! whatever implements [`DspCore`] without interpreting them. A full core
//! (interpreter or recompiler) plugs in here; [`NullDspCore`] is the
//! fast-approximate stand-in that keeps the register protocol alive.

use flipper_io_snapshot::codec::{Decoder, Encoder};
use flipper_io_snapshot::SnapshotResult;

use crate::regs::{CTRL_CORE_MASK, CTRL_RESET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mailbox {
    /// CPU -> DSP direction.
    ToDsp,
    /// DSP -> CPU direction.
    FromDsp,
}

/// Pluggable DSP execution core.
///
/// Mailbox accessors may have side effects (consuming a queued message on a
/// low-half read is the usual protocol); the interface never caches their
/// results.
pub trait DspCore {
    fn read_mailbox_high(&mut self, mailbox: Mailbox) -> u16;
    fn read_mailbox_low(&mut self, mailbox: Mailbox) -> u16;
    fn write_mailbox_high(&mut self, mailbox: Mailbox, value: u16);
    fn write_mailbox_low(&mut self, mailbox: Mailbox, value: u16);

    /// Core-owned view of the control bits under
    /// [`CTRL_CORE_MASK`](crate::regs::CTRL_CORE_MASK).
    fn read_control(&mut self) -> u16;

    /// Applies a CPU control write and returns the resulting core-owned bits
    /// (a requested reset may already have completed and read back as 0).
    fn write_control(&mut self, value: u16) -> u16;

    /// Runs the core for `cycles` DSP cycles.
    fn update(&mut self, cycles: u32);

    /// True when the core consumes its cycle grants instruction-by-instruction
    /// and cares about sub-slice pacing.
    fn is_cycle_stepped(&self) -> bool {
        false
    }

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;

    fn shutdown(&mut self) {}
}

/// Core stand-in: latches mailbox words and control bits, executes nothing.
#[derive(Default)]
pub struct NullDspCore {
    control: u16,
    to_dsp: u32,
    from_dsp: u32,
}

impl NullDspCore {
    pub fn new() -> Self {
        Self::default()
    }

    fn word(&self, mailbox: Mailbox) -> u32 {
        match mailbox {
            Mailbox::ToDsp => self.to_dsp,
            Mailbox::FromDsp => self.from_dsp,
        }
    }

    fn word_mut(&mut self, mailbox: Mailbox) -> &mut u32 {
        match mailbox {
            Mailbox::ToDsp => &mut self.to_dsp,
            Mailbox::FromDsp => &mut self.from_dsp,
        }
    }
}

impl DspCore for NullDspCore {
    fn read_mailbox_high(&mut self, mailbox: Mailbox) -> u16 {
        (self.word(mailbox) >> 16) as u16
    }

    fn read_mailbox_low(&mut self, mailbox: Mailbox) -> u16 {
        self.word(mailbox) as u16
    }

    fn write_mailbox_high(&mut self, mailbox: Mailbox, value: u16) {
        let word = self.word_mut(mailbox);
        *word = (*word & 0x0000_FFFF) | ((value as u32) << 16);
    }

    fn write_mailbox_low(&mut self, mailbox: Mailbox, value: u16) {
        let word = self.word_mut(mailbox);
        *word = (*word & 0xFFFF_0000) | value as u32;
    }

    fn read_control(&mut self) -> u16 {
        self.control
    }

    fn write_control(&mut self, value: u16) -> u16 {
        // A requested reset completes instantly, so the bit never reads back.
        self.control = value & CTRL_CORE_MASK & !CTRL_RESET;
        self.control
    }

    fn update(&mut self, _cycles: u32) {}

    fn save_state(&self) -> Vec<u8> {
        Encoder::new()
            .u16(self.control)
            .u32(self.to_dsp)
            .u32(self.from_dsp)
            .finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let mut d = Decoder::new(bytes);
        self.control = d.u16()?;
        self.to_dsp = d.u32()?;
        self.from_dsp = d.u32()?;
        d.finish()
    }
}
