//! GameCube-class audio/DSP interface device model.
//!
//! Models the CPU-visible side of the console's DSP subsystem: the mailbox
//! bridge to the DSP execution core, the shared control/interrupt register,
//! the auxiliary RAM (ARAM) controller with its one-shot bulk DMA, and the
//! streaming audio DMA that feeds the host audio sink.
//!
//! The device owns no host resources. Guest memory, the expansion bus, the
//! audio sink and the timing service are passed in per call as a [`DspBus`];
//! the DSP execution core and the CPU interrupt line are injected at
//! construction.

#![forbid(unsafe_code)]

pub mod aram;
pub mod bus;
pub mod dma;
pub mod dsp_core;
pub mod interface;
pub mod regs;
pub mod sched;
pub mod sink;
mod snapshot;

pub use aram::{AramStore, ARAM_MASK, ARAM_SIZE};
pub use bus::{AuxBus, InterruptLine, NoAuxBus, NoIrq, TestIrqLine};
pub use dma::{AramDma, AudioDma, DmaDirection};
pub use dsp_core::{DspCore, Mailbox, NullDspCore};
pub use interface::{request_dsp_interrupt, DspBus, DspIo};
pub use sched::{DspEvent, EventScheduler, FromThread, ManualScheduler};
pub use sink::{AudioSink, CaptureSink, NullSink};
