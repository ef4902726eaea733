//! Audio DMA streaming: start edge, per-tick bookkeeping, auto-reload.

use flipper_dsp::regs::*;
use flipper_dsp::{
    CaptureSink, DspBus, DspIo, FromThread, ManualScheduler, NoAuxBus, NullDspCore, NullSink,
    TestIrqLine,
};
use flipper_mem::{MainBus, Ram};

struct Host {
    mem: Ram,
    aux: NoAuxBus,
    sink: CaptureSink,
    sched: ManualScheduler,
}

impl Host {
    fn new() -> Self {
        Self {
            mem: Ram::new(0x10000),
            aux: NoAuxBus,
            sink: CaptureSink::new(),
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

/// Writes `blocks * 16` ramp samples starting at `addr` and returns them.
fn fill_ramp(mem: &mut Ram, addr: u32, blocks: u16) -> Vec<i16> {
    let mut expected = Vec::new();
    for i in 0..u32::from(blocks) * 16 {
        let sample = (i as i16).wrapping_mul(3) - 100;
        mem.write_u16(addr + i * 2, sample as u16);
        expected.push(sample);
    }
    expected
}

#[test]
fn enable_edge_pushes_whole_buffer_and_schedules_interrupt() {
    let (mut io, irq, mut host) = device();
    let expected = fill_ramp(&mut host.mem, 0x1000, 2);

    io.io_write16(REG_CONTROL, INT_AUDIO_ENABLE, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_START_HI, 0, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_START_LO, 0x1000, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000 | 2, &mut host.bus());

    assert_eq!(host.sink.samples, expected);

    // The start is an emulation-thread event; only core-raised interrupts
    // use the cross-thread path.
    assert_eq!(host.sched.pending_origins(), vec![FromThread::Cpu]);

    // The first interrupt comes 200 cycles after the start, not inline.
    assert!(!irq.level());
    host.pump(&mut io, 199);
    assert!(!irq.level());
    host.pump(&mut io, 1);
    assert!(irq.level());
    assert_ne!(io.io_read16(REG_CONTROL) & INT_AUDIO, 0);
}

#[test]
fn rewriting_control_while_running_does_not_relatch() {
    let (mut io, _irq, mut host) = device();
    fill_ramp(&mut host.mem, 0x1000, 4);

    io.io_write16(REG_AUDIO_DMA_START_LO, 0x1000, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000 | 4, &mut host.bus());
    let pushed = host.sink.samples.len();

    // Still enabled: no edge, no push, no new event.
    let events_before = host.sched.pending();
    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000 | 2, &mut host.bus());
    assert_eq!(host.sink.samples.len(), pushed);
    assert_eq!(host.sched.pending(), events_before);
    // The old pass keeps draining; the new count applies at reload.
    assert_eq!(io.io_read16(REG_AUDIO_DMA_BLOCKS_LEFT), 3);
}

#[test]
fn ticks_drain_blocks_and_reload_restarts_the_pass() {
    let (mut io, _irq, mut host) = device();
    let expected = fill_ramp(&mut host.mem, 0x2000, 2);

    io.io_write16(REG_AUDIO_DMA_START_LO, 0x2000, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000 | 2, &mut host.bus());
    host.sink.samples.clear();
    assert_eq!(io.io_read16(REG_AUDIO_DMA_BLOCKS_LEFT), 1);

    io.tick_audio(&mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_BLOCKS_LEFT), 0);
    assert!(host.sink.samples.is_empty());

    // Draining the last block reloads, re-pushes and raises immediately.
    io.tick_audio(&mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_BLOCKS_LEFT), 1);
    assert_eq!(host.sink.samples, expected);
    assert_ne!(io.io_read16(REG_CONTROL) & INT_AUDIO, 0);
}

#[test]
fn new_source_address_applies_at_reload() {
    let (mut io, _irq, mut host) = device();
    fill_ramp(&mut host.mem, 0x2000, 1);
    let second = fill_ramp(&mut host.mem, 0x3000, 1);

    io.io_write16(REG_AUDIO_DMA_START_LO, 0x2000, &mut host.bus());
    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000 | 1, &mut host.bus());

    io.io_write16(REG_AUDIO_DMA_START_LO, 0x3000, &mut host.bus());
    host.sink.samples.clear();
    io.tick_audio(&mut host.bus());
    assert_eq!(host.sink.samples, second);
}

#[test]
fn disabled_ticks_push_one_silent_block() {
    let (mut io, _irq, mut host) = device();

    io.tick_audio(&mut host.bus());
    io.tick_audio(&mut host.bus());
    assert_eq!(host.sink.samples, vec![0i16; 32]);
}

#[test]
fn zero_block_stream_stays_silent_after_start() {
    let (mut io, _irq, mut host) = device();

    io.io_write16(REG_AUDIO_DMA_CONTROL, 0x8000, &mut host.bus());
    host.pump(&mut io, 200);
    // Ack the start interrupt, then confirm reloads neither push nor raise.
    io.io_write16(REG_CONTROL, INT_AUDIO, &mut host.bus());
    for _ in 0..3 {
        io.tick_audio(&mut host.bus());
    }
    assert!(host.sink.samples.is_empty());
    assert_eq!(io.io_read16(REG_CONTROL) & INT_AUDIO, 0);
    assert_eq!(io.io_read16(REG_AUDIO_DMA_BLOCKS_LEFT), 0);
}

#[test]
fn source_high_half_masks_depend_on_memory_model() {
    let (mut io, _irq, mut host) = device();
    io.io_write16(REG_AUDIO_DMA_START_HI, 0xFFFF, &mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_START_HI), 0x03FF);

    let pool = std::rc::Rc::new(std::cell::RefCell::new(vec![0u8; 0x0400_0000]));
    let irq = TestIrqLine::new();
    let mut io = DspIo::new_unified(pool, Box::new(NullDspCore::new()), Box::new(irq.clone()));
    let mut sink = NullSink;
    let sched = ManualScheduler::new();
    let mut aux = NoAuxBus;
    let mut mem = Ram::new(0x1000);
    let mut bus = DspBus {
        mem: &mut mem,
        aux: &mut aux,
        sink: &mut sink,
        sched: &sched,
    };
    io.io_write16(REG_AUDIO_DMA_START_HI, 0xFFFF, &mut bus);
    assert_eq!(io.io_read16(REG_AUDIO_DMA_START_HI), 0x1FFF);
}

#[test]
fn low_halves_are_32_byte_aligned() {
    let (mut io, _irq, mut host) = device();
    io.io_write16(REG_AUDIO_DMA_START_LO, 0x123F, &mut host.bus());
    assert_eq!(io.io_read16(REG_AUDIO_DMA_START_LO), 0x1220);
}
