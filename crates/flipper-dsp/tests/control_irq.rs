//! Control register and interrupt line behavior.

use flipper_dsp::regs::*;
use flipper_dsp::{
    DspBus, DspEvent, DspIo, ManualScheduler, NoAuxBus, NullDspCore, NullSink, TestIrqLine,
};
use flipper_mem::Ram;

struct Host {
    mem: Ram,
    aux: NoAuxBus,
    sink: NullSink,
    sched: ManualScheduler,
}

impl Host {
    fn new() -> Self {
        Self {
            mem: Ram::new(0x10000),
            aux: NoAuxBus,
            sink: NullSink,
            sched: ManualScheduler::new(),
        }
    }

    fn bus(&mut self) -> DspBus<'_> {
        DspBus {
            mem: &mut self.mem,
            aux: &mut self.aux,
            sink: &mut self.sink,
            sched: &self.sched,
        }
    }

    fn pump(&mut self, io: &mut DspIo, cycles: u64) {
        for (event, payload) in self.sched.advance(cycles) {
            io.service_event(event, payload);
        }
    }
}

fn device() -> (DspIo, TestIrqLine, Host) {
    let irq = TestIrqLine::new();
    let io = DspIo::new(Box::new(NullDspCore::new()), Box::new(irq.clone()));
    (io, irq, Host::new())
}

#[test]
fn line_follows_pending_and_enable() {
    let (mut io, irq, mut host) = device();

    io.service_event(DspEvent::RaiseInterrupt, u32::from(INT_AUDIO));
    assert_ne!(io.io_read16(REG_CONTROL) & INT_AUDIO, 0);
    assert!(!irq.level(), "pending without enable must not assert the line");

    io.io_write16(REG_CONTROL, INT_AUDIO_ENABLE, &mut host.bus());
    assert!(irq.level());

    // Acknowledging the pending bit drops the line even with enable held.
    io.io_write16(REG_CONTROL, INT_AUDIO_ENABLE | INT_AUDIO, &mut host.bus());
    assert_eq!(io.io_read16(REG_CONTROL) & INT_AUDIO, 0);
    assert!(!irq.level());
}

#[test]
fn writes_cannot_set_pending_bits() {
    let (mut io, irq, mut host) = device();

    io.io_write16(
        REG_CONTROL,
        INT_AUDIO | INT_ARAM | INT_DSP,
        &mut host.bus(),
    );
    assert_eq!(io.io_read16(REG_CONTROL) & INT_PENDING_MASK, 0);
    assert!(!irq.level());
}

#[test]
fn each_source_is_acknowledged_independently() {
    let (mut io, _irq, mut host) = device();

    io.service_event(DspEvent::RaiseInterrupt, u32::from(INT_AUDIO | INT_DSP));
    // Ack only the audio source.
    io.io_write16(REG_CONTROL, INT_AUDIO, &mut host.bus());
    let ctrl = io.io_read16(REG_CONTROL);
    assert_eq!(ctrl & INT_AUDIO, 0);
    assert_ne!(ctrl & INT_DSP, 0);
}

#[test]
fn reset_bit_stops_audio_dma() {
    let (mut io, _irq, mut host) = device();

    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x0005, &mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_CONTROL), 0x0005);

    io.io_write16(REG_CONTROL, CTRL_RESET, &mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_CONTROL), 0);
    // The reset request itself never reads back.
    assert_eq!(io.io_read16(REG_CONTROL) & CTRL_RESET, 0);
}

#[test]
fn dma_active_is_read_only_status() {
    let (mut io, irq, mut host) = device();

    io.io_write16(REG_CONTROL, INT_ARAM_ENABLE, &mut host.bus());
    io.io_write16(REG_ARAM_DMA_COUNT_HI, 0, &mut host.bus());
    io.io_write16(REG_ARAM_DMA_COUNT_LO, 0x0020, &mut host.bus());
    assert_ne!(io.io_read16(REG_CONTROL) & CTRL_DMA_ACTIVE, 0);

    // CPU writes cannot flip the status bit in either direction.
    io.io_write16(REG_CONTROL, INT_ARAM_ENABLE, &mut host.bus());
    assert_ne!(io.io_read16(REG_CONTROL) & CTRL_DMA_ACTIVE, 0);

    host.pump(&mut io, 246);
    let ctrl = io.io_read16(REG_CONTROL);
    assert_eq!(ctrl & CTRL_DMA_ACTIVE, 0);
    assert_ne!(ctrl & INT_ARAM, 0);
    assert!(irq.level());
}

#[test]
fn pad_bits_are_adopted_but_harmless() {
    let (mut io, irq, mut host) = device();

    // Nonzero padding is an anomaly to warn about, not to reject: the bits
    // read back and nothing else changes.
    io.io_write16(REG_CONTROL, CTRL_PAD_MASK | CTRL_HALT, &mut host.bus());
    let ctrl = io.io_read16(REG_CONTROL);
    assert_eq!(ctrl & CTRL_PAD_MASK, CTRL_PAD_MASK);
    assert_ne!(ctrl & CTRL_HALT, 0);
    assert!(!irq.level());

    io.io_write16(REG_CONTROL, CTRL_HALT, &mut host.bus());
    assert_eq!(io.io_read16(REG_CONTROL) & CTRL_PAD_MASK, 0);
}

#[test]
fn halt_bit_round_trips_through_the_core() {
    let (mut io, _irq, mut host) = device();

    // Power-on state is halted.
    assert_ne!(io.io_read16(REG_CONTROL) & CTRL_HALT, 0);
    io.io_write16(REG_CONTROL, 0, &mut host.bus());
    assert_eq!(io.io_read16(REG_CONTROL) & CTRL_HALT, 0);
}

#[test]
fn unmapped_registers_read_zero() {
    let (mut io, _irq, _host) = device();
    assert_eq!(io.io_read16(0x5008), 0);
    assert_eq!(io.io_read16(0x503C), 0);
}
