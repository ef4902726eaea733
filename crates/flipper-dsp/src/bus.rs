//! Host-side seams: the CPU interrupt line and the auxiliary expansion bus.

use std::cell::Cell;
use std::rc::Rc;

/// Level-triggered CPU interrupt line.
///
/// `set_level` is idempotent; the device re-drives the line after every
/// control-register change rather than tracking edges.
pub trait InterruptLine {
    fn set_level(&self, high: bool);
}

/// Disconnected line.
pub struct NoIrq;

impl InterruptLine for NoIrq {
    fn set_level(&self, _high: bool) {}
}

/// Test double that records the current line level.
#[derive(Clone, Default)]
pub struct TestIrqLine {
    level: Rc<Cell<bool>>,
}

impl TestIrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }
}

impl InterruptLine for TestIrqLine {
    fn set_level(&self, high: bool) {
        self.level.set(high);
    }
}

/// Expansion device mapped above the ARAM store (disk-drive style add-ons).
/// ARAM DMA granules whose address falls past the end of a dedicated store
/// are routed here instead.
pub trait AuxBus {
    fn read_u64(&mut self, addr: u32) -> u64;
    fn write_u64(&mut self, addr: u32, value: u64);
}

/// Absent expansion device: reads zero, ignores writes.
pub struct NoAuxBus;

impl AuxBus for NoAuxBus {
    fn read_u64(&mut self, _addr: u32) -> u64 {
        0
    }

    fn write_u64(&mut self, _addr: u32, _value: u64) {}
}
