//! The audio/DSP interface: register bank, interrupts and both DMA engines.

use flipper_mem::MainBus;

use crate::aram::AramStore;
use crate::bus::{AuxBus, InterruptLine};
use crate::dma::{
    AramDma, AudioDma, DmaDirection, ARAM_DMA_CYCLES_PER_32_BYTES, AUDIO_BLOCK_BYTES,
    DMA_ADDRESS_WRAP_MASK, DMA_GRANULE_BYTES, FRAMES_PER_BLOCK,
};
use crate::dsp_core::{DspCore, Mailbox};
use crate::regs::*;
use crate::sched::{DspEvent, EventScheduler, FromThread};
use crate::sink::AudioSink;

/// Virtual cycles between latching an audio DMA start and raising its
/// first interrupt.
pub const AUDIO_DMA_START_DELAY_CYCLES: u64 = 200;
/// DSP cycles burned from the pending grant on a mailbox high-half read, to
/// pace tight CPU polling loops against a cycle-stepped core.
pub const DSP_MAIL_SLICE_CYCLES: u32 = 72;

const DSP_SLICE_REMAINDER: u32 = 6;

/// Host collaborators handed to the mutating entry points per call. The
/// device does not own its memory, audio output or timing service.
pub struct DspBus<'a> {
    pub mem: &'a mut dyn MainBus,
    pub aux: &'a mut dyn AuxBus,
    pub sink: &'a mut dyn AudioSink,
    pub sched: &'a dyn EventScheduler,
}

/// Schedules interrupt-pending bits to be set after `delay_cycles`. The DSP
/// core side uses this to signal mailbox traffic without touching the
/// interface directly.
pub fn request_dsp_interrupt(sched: &dyn EventScheduler, ints: u16, delay_cycles: u64) {
    sched.schedule(
        delay_cycles,
        DspEvent::RaiseInterrupt,
        u32::from(ints & INT_PENDING_MASK),
        FromThread::Any,
    );
}

pub struct DspIo {
    control: u16,
    audio_dma: AudioDma,
    aram_dma: AramDma,
    pub(crate) aram: AramStore,
    aram_info: u16,
    aram_mode: u16,
    aram_refresh: u16,
    /// DSP cycles granted but not yet run on a cycle-stepped core.
    slice_cycles: u32,
    pub(crate) core: Box<dyn DspCore>,
    irq: Box<dyn InterruptLine>,
}

impl DspIo {
    pub fn new(core: Box<dyn DspCore>, irq: Box<dyn InterruptLine>) -> Self {
        Self::with_store(AramStore::dedicated(), core, irq)
    }

    /// Unified-memory variant: ARAM aliases the given pool and audio DMA
    /// source addresses gain three extra high bits.
    pub fn new_unified(
        pool: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
        core: Box<dyn DspCore>,
        irq: Box<dyn InterruptLine>,
    ) -> Self {
        Self::with_store(AramStore::unified(pool), core, irq)
    }

    fn with_store(aram: AramStore, core: Box<dyn DspCore>, irq: Box<dyn InterruptLine>) -> Self {
        let mut io = Self {
            control: 0,
            audio_dma: AudioDma::default(),
            aram_dma: AramDma::default(),
            aram,
            aram_info: 0,
            aram_mode: 0,
            aram_refresh: 0,
            slice_cycles: 0,
            core,
            irq,
        };
        io.reset();
        io
    }

    /// Power-on register values. The core comes up halted; the ARAM
    /// controller reports itself initialized.
    pub fn reset(&mut self) {
        self.core.write_control(CTRL_HALT);
        self.control = CTRL_HALT;
        self.audio_dma = AudioDma::default();
        self.aram_dma = AramDma::default();
        self.aram_info = 0;
        self.aram_mode = 1;
        self.aram_refresh = 156;
        self.slice_cycles = 0;
    }

    pub fn shutdown(&mut self) {
        self.core.shutdown();
    }

    fn audio_addr_hi_mask(&self) -> u16 {
        if self.aram.is_unified() {
            WMASK_ADDR_HI_UNIFIED
        } else {
            WMASK_ADDR_HI
        }
    }

    /// Re-drives the CPU interrupt line from the current control word.
    /// Also the post-snapshot-restore hook.
    pub fn sync_interrupt_line(&self) {
        self.irq.set_level(interrupt_line_level(self.control));
    }

    fn raise_interrupt(&mut self, ints: u16) {
        self.control |= ints & INT_PENDING_MASK;
        self.sync_interrupt_line();
    }

    /// CPUs poll the mailbox high halves in tight loops; burn a slice of the
    /// pending cycle grant so a cycle-stepped core makes progress between
    /// polls instead of drifting from the virtual timeline.
    fn pace_mailbox_poll(&mut self) {
        if self.slice_cycles > DSP_MAIL_SLICE_CYCLES && self.core.is_cycle_stepped() {
            self.core.update(DSP_MAIL_SLICE_CYCLES);
            self.slice_cycles -= DSP_MAIL_SLICE_CYCLES;
        }
    }

    pub fn io_read16(&mut self, offset: u32) -> u16 {
        match offset {
            REG_MAIL_TO_DSP_HI => {
                self.pace_mailbox_poll();
                self.core.read_mailbox_high(Mailbox::ToDsp)
            }
            REG_MAIL_TO_DSP_LO => self.core.read_mailbox_low(Mailbox::ToDsp),
            REG_MAIL_FROM_DSP_HI => {
                self.pace_mailbox_poll();
                self.core.read_mailbox_high(Mailbox::FromDsp)
            }
            REG_MAIL_FROM_DSP_LO => self.core.read_mailbox_low(Mailbox::FromDsp),
            REG_CONTROL => {
                (self.control & !CTRL_CORE_MASK) | (self.core.read_control() & CTRL_CORE_MASK)
            }
            REG_ARAM_INFO => self.aram_info,
            REG_ARAM_MODE => self.aram_mode,
            REG_ARAM_REFRESH => self.aram_refresh,
            REG_ARAM_DMA_MAIN_HI => (self.aram_dma.main_addr >> 16) as u16,
            REG_ARAM_DMA_MAIN_LO => self.aram_dma.main_addr as u16,
            REG_ARAM_DMA_ARAM_HI => (self.aram_dma.aram_addr >> 16) as u16,
            REG_ARAM_DMA_ARAM_LO => self.aram_dma.aram_addr as u16,
            REG_ARAM_DMA_COUNT_HI => (self.aram_dma.count >> 16) as u16,
            REG_ARAM_DMA_COUNT_LO => self.aram_dma.count as u16,
            REG_AUDIO_DMA_START_HI => (self.audio_dma.source_address >> 16) as u16,
            REG_AUDIO_DMA_START_LO => self.audio_dma.source_address as u16,
            REG_AUDIO_DMA_CONTROL => self.audio_dma.control,
            REG_AUDIO_DMA_BLOCKS_LEFT => self.audio_dma.blocks_left_readback(),
            _ => {
                log::warn!("read from unmapped DSP register {offset:#06x}");
                0
            }
        }
    }

    pub fn io_write16(&mut self, offset: u32, value: u16, bus: &mut DspBus) {
        match offset {
            REG_MAIL_TO_DSP_HI => self.core.write_mailbox_high(Mailbox::ToDsp, value),
            REG_MAIL_TO_DSP_LO => self.core.write_mailbox_low(Mailbox::ToDsp, value),
            REG_MAIL_FROM_DSP_HI | REG_MAIL_FROM_DSP_LO => {
                log::warn!("write to read-only DSP mailbox register {offset:#06x}");
            }
            REG_CONTROL => self.write_control(value, bus),
            REG_ARAM_INFO => self.aram_info = value & WMASK_ARAM_INFO,
            REG_ARAM_MODE => {
                log::warn!("write to read-only ARAM controller status register");
            }
            REG_ARAM_REFRESH => self.aram_refresh = value & WMASK_ARAM_REFRESH,
            REG_ARAM_DMA_MAIN_HI => {
                set_hi(&mut self.aram_dma.main_addr, value & WMASK_ADDR_HI);
            }
            REG_ARAM_DMA_MAIN_LO => {
                set_lo(&mut self.aram_dma.main_addr, value & WMASK_ADDR_LO);
            }
            REG_ARAM_DMA_ARAM_HI => {
                set_hi(&mut self.aram_dma.aram_addr, value & WMASK_ADDR_HI);
            }
            REG_ARAM_DMA_ARAM_LO => {
                set_lo(&mut self.aram_dma.aram_addr, value & WMASK_ADDR_LO);
            }
            REG_ARAM_DMA_COUNT_HI => {
                set_hi(&mut self.aram_dma.count, value & (WMASK_COUNT_DIR | WMASK_ADDR_HI));
            }
            REG_ARAM_DMA_COUNT_LO => {
                set_lo(&mut self.aram_dma.count, value & WMASK_ADDR_LO);
                self.do_aram_dma(bus);
            }
            REG_AUDIO_DMA_START_HI => {
                let masked = value & self.audio_addr_hi_mask();
                set_hi(&mut self.audio_dma.source_address, masked);
            }
            REG_AUDIO_DMA_START_LO => {
                set_lo(&mut self.audio_dma.source_address, value & WMASK_ADDR_LO);
            }
            REG_AUDIO_DMA_CONTROL => self.write_audio_dma_control(value, bus),
            REG_AUDIO_DMA_BLOCKS_LEFT => {
                log::warn!("write to read-only audio DMA blocks-left register");
            }
            _ => {
                log::warn!("write to unmapped DSP register {offset:#06x} (value {value:#06x})");
            }
        }
    }

    /// 32-bit registers are two 16-bit halves, high half first.
    pub fn io_read32(&mut self, offset: u32) -> u32 {
        (u32::from(self.io_read16(offset)) << 16) | u32::from(self.io_read16(offset + 2))
    }

    pub fn io_write32(&mut self, offset: u32, value: u32, bus: &mut DspBus) {
        self.io_write16(offset, (value >> 16) as u16, bus);
        self.io_write16(offset + 2, value as u16, bus);
    }

    fn write_control(&mut self, value: u16, _bus: &mut DspBus) {
        // Core-owned bits go through the core, which may transform them (a
        // reset can complete before it is ever observable).
        let merged =
            (value & !CTRL_CORE_MASK) | (self.core.write_control(value) & CTRL_CORE_MASK);

        if value & CTRL_RESET != 0 {
            self.audio_dma.control = 0;
        }

        // Pending bits and DMA status are never set by CPU writes. Pad bits
        // are adopted into the readable word; nonzero values only warn.
        let keep = INT_PENDING_MASK | CTRL_DMA_ACTIVE;
        self.control = (self.control & keep) | (merged & !keep);
        // Writing 1 to a pending bit acknowledges it.
        self.control &= !(value & INT_PENDING_MASK);

        if value & CTRL_PAD_MASK != 0 {
            log::warn!("nonzero pad bits in DSP control write: {value:#06x}");
        }

        self.sync_interrupt_line();
    }

    fn write_audio_dma_control(&mut self, value: u16, bus: &mut DspBus) {
        let was_enabled = self.audio_dma.enabled();
        self.audio_dma.control = value;

        // Latch addresses and counts only on a disabled-to-enabled edge;
        // rewrites while running take effect at the next reload.
        if !was_enabled && self.audio_dma.enabled() {
            self.audio_dma.current_source_address = self.audio_dma.source_address;
            self.audio_dma.remaining_blocks = self.audio_dma.num_blocks();
            // The whole buffer is made audible right away; the per-tick
            // bookkeeping below only tracks the consumer's position.
            self.push_audio(
                bus,
                self.audio_dma.source_address,
                u32::from(self.audio_dma.num_blocks()),
            );
            bus.sched.schedule(
                AUDIO_DMA_START_DELAY_CYCLES,
                DspEvent::RaiseInterrupt,
                u32::from(INT_AUDIO),
                FromThread::Cpu,
            );
        }
    }

    fn push_audio(&self, bus: &mut DspBus, addr: u32, blocks: u32) {
        let samples = (blocks * FRAMES_PER_BLOCK * 2) as usize;
        let mut buf = Vec::with_capacity(samples);
        for i in 0..samples as u32 {
            buf.push(bus.mem.read_u16(addr.wrapping_add(i * 2)) as i16);
        }
        bus.sink.push_interleaved_i16(&buf);
    }

    /// 4 kHz streaming tick. Advances the audio DMA consumer position while
    /// enabled; pushes one silent block while disabled so the sink's clock
    /// never starves.
    pub fn tick_audio(&mut self, bus: &mut DspBus) {
        if !self.audio_dma.enabled() {
            let silence = [0i16; (FRAMES_PER_BLOCK * 2) as usize];
            bus.sink.push_interleaved_i16(&silence);
            return;
        }

        if self.audio_dma.remaining_blocks != 0 {
            self.audio_dma.remaining_blocks -= 1;
            self.audio_dma.current_source_address = self
                .audio_dma
                .current_source_address
                .wrapping_add(AUDIO_BLOCK_BYTES);
        }

        if self.audio_dma.remaining_blocks == 0 {
            // Reload from the live registers and restart the pass.
            self.audio_dma.current_source_address = self.audio_dma.source_address;
            self.audio_dma.remaining_blocks = self.audio_dma.num_blocks();
            if self.audio_dma.remaining_blocks != 0 {
                self.push_audio(
                    bus,
                    self.audio_dma.source_address,
                    u32::from(self.audio_dma.num_blocks()),
                );
                self.raise_interrupt(INT_AUDIO);
            }
        }
    }

    /// Performs the latched ARAM transfer and schedules its completion
    /// (status clear + interrupt) for when the real hardware would finish.
    fn do_aram_dma(&mut self, bus: &mut DspBus) {
        self.control |= CTRL_DMA_ACTIVE;
        self.sync_interrupt_line();

        let ticks = u64::from(self.aram_dma.byte_count() / 32) * ARAM_DMA_CYCLES_PER_32_BYTES;
        bus.sched
            .schedule(ticks, DspEvent::AramDmaComplete, 0, FromThread::Cpu);

        // The data moves eagerly; only the status bit and interrupt are
        // deferred to the completion event.
        let direction = self.aram_dma.direction();
        // The store-vs-expansion-bus decision is made once, from the starting
        // address; a transfer that crosses a boundary mid-way wraps within
        // its chosen target instead of switching.
        let use_store = self.aram.is_unified()
            || (self.aram_dma.aram_addr & DMA_ADDRESS_WRAP_MASK) < self.aram.size();
        while self.aram_dma.byte_count() != 0 {
            let main = self.aram_dma.main_addr & DMA_ADDRESS_WRAP_MASK;
            let aram = self.aram_dma.aram_addr & DMA_ADDRESS_WRAP_MASK;
            match direction {
                DmaDirection::MainToAram => {
                    let value = bus.mem.read_u64(main);
                    if use_store {
                        self.aram.write_u64(aram, value);
                        // Addressing-info layout 4 mirrors the low 4 MiB into
                        // the expansion aperture above it.
                        if self.aram_info & 0x000F == 4 && aram < 0x0040_0000 {
                            self.aram.write_u64(aram + 0x0040_0000, value);
                        }
                    } else {
                        bus.aux.write_u64(aram, value);
                    }
                }
                DmaDirection::AramToMain => {
                    let value = if use_store {
                        self.aram.read_u64(aram)
                    } else {
                        bus.aux.read_u64(aram)
                    };
                    bus.mem.write_u64(main, value);
                }
            }
            self.aram_dma.main_addr = self.aram_dma.main_addr.wrapping_add(DMA_GRANULE_BYTES);
            self.aram_dma.aram_addr = self.aram_dma.aram_addr.wrapping_add(DMA_GRANULE_BYTES);
            self.aram_dma.consume_granule();
        }
    }

    /// Delivers a previously scheduled event.
    pub fn service_event(&mut self, event: DspEvent, payload: u32) {
        match event {
            DspEvent::RaiseInterrupt => self.raise_interrupt(payload as u16),
            DspEvent::AramDmaComplete => {
                self.control &= !CTRL_DMA_ACTIVE;
                self.raise_interrupt(INT_ARAM);
            }
        }
    }

    /// Hands the core a budget of DSP cycles for this timeslice. A
    /// cycle-stepped core first finishes the remainder of the previous
    /// grant, keeping at most a few cycles of carry-over.
    pub fn grant_dsp_cycles(&mut self, cycles: u32) {
        if self.core.is_cycle_stepped() {
            self.core.update(self.slice_cycles);
            self.slice_cycles %= DSP_SLICE_REMAINDER;
            self.slice_cycles += cycles;
        } else {
            self.core.update(cycles);
        }
    }

    /// Byte peek into the ARAM store, for debuggers and the core's own
    /// accelerator path. Always wraps modulo the store size.
    pub fn read_aram(&self, addr: u32) -> u8 {
        self.aram.read_u8(addr)
    }

    pub fn write_aram(&mut self, addr: u32, value: u8) {
        self.aram.write_u8(addr, value);
    }

    pub(crate) fn state_for_snapshot(&self) -> SnapshotState {
        SnapshotState {
            control: self.control,
            audio_dma: self.audio_dma,
            aram_dma: self.aram_dma,
            aram_info: self.aram_info,
            aram_mode: self.aram_mode,
            aram_refresh: self.aram_refresh,
            slice_cycles: self.slice_cycles,
        }
    }

    pub(crate) fn apply_snapshot_state(&mut self, s: SnapshotState) {
        self.control = s.control;
        self.audio_dma = s.audio_dma;
        self.aram_dma = s.aram_dma;
        self.aram_info = s.aram_info;
        self.aram_mode = s.aram_mode;
        self.aram_refresh = s.aram_refresh;
        self.slice_cycles = s.slice_cycles;
    }
}

/// Plain register words captured for serialization.
#[derive(Clone, Copy)]
pub(crate) struct SnapshotState {
    pub control: u16,
    pub audio_dma: AudioDma,
    pub aram_dma: AramDma,
    pub aram_info: u16,
    pub aram_mode: u16,
    pub aram_refresh: u16,
    pub slice_cycles: u32,
}

fn set_hi(word: &mut u32, value: u16) {
    *word = (*word & 0x0000_FFFF) | (u32::from(value) << 16);
}

fn set_lo(word: &mut u32, value: u16) {
    *word = (*word & 0xFFFF_0000) | u32::from(value);
}
