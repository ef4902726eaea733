//! Deferred-event scheduling seam.
//!
//! The device never raises interrupts or completes DMA inline; it schedules an
//! event for a future virtual-cycle deadline and reacts when the host delivers
//! it back through [`crate::interface::DspIo::service_event`]. The host's
//! event loop implements [`EventScheduler`]; tests use [`ManualScheduler`].

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspEvent {
    /// Payload: interrupt-pending bits to set in the control register.
    RaiseInterrupt,
    /// Payload unused. Performs the latched ARAM transfer and clears the
    /// DMA-active status bit.
    AramDmaComplete,
}

/// Which host threads may deliver the event back to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromThread {
    /// Deliver on the CPU thread only.
    Cpu,
    /// Any host thread may deliver.
    Any,
}

/// Host timing service.
///
/// Contract: each scheduled event is delivered exactly once, at or after its
/// deadline. Events scheduled from the same thread are delivered in deadline
/// order (ties in schedule order). There is no cancellation.
pub trait EventScheduler {
    fn schedule(&self, delay_cycles: u64, event: DspEvent, payload: u32, from: FromThread);
}

#[derive(Debug)]
struct Pending {
    due: u64,
    seq: u64,
    event: DspEvent,
    payload: u32,
    from: FromThread,
}

#[derive(Default)]
struct ManualInner {
    now: u64,
    seq: u64,
    queue: Vec<Pending>,
}

/// Manually-advanced scheduler for tests: collect events, step virtual time,
/// and deliver whatever came due.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.inner.borrow().queue.iter().map(|p| p.due).min()
    }

    /// Submission origins of the still-queued events, in schedule order.
    pub fn pending_origins(&self) -> Vec<FromThread> {
        self.inner.borrow().queue.iter().map(|p| p.from).collect()
    }

    /// Advances virtual time and drains events due at or before the new time,
    /// in (deadline, schedule) order.
    pub fn advance(&self, cycles: u64) -> Vec<(DspEvent, u32)> {
        let mut inner = self.inner.borrow_mut();
        inner.now += cycles;
        let now = inner.now;
        let mut due: Vec<Pending> = Vec::new();
        let mut i = 0;
        while i < inner.queue.len() {
            if inner.queue[i].due <= now {
                due.push(inner.queue.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| (p.event, p.payload)).collect()
    }
}

impl EventScheduler for ManualScheduler {
    fn schedule(&self, delay_cycles: u64, event: DspEvent, payload: u32, from: FromThread) {
        let mut inner = self.inner.borrow_mut();
        let due = inner.now + delay_cycles;
        let seq = inner.seq;
        inner.seq += 1;
        inner.queue.push(Pending {
            due,
            seq,
            event,
            payload,
            from,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fire_at_or_after_deadline() {
        let sched = ManualScheduler::new();
        sched.schedule(200, DspEvent::RaiseInterrupt, 0x8, FromThread::Any);
        assert!(sched.advance(199).is_empty());
        assert_eq!(
            sched.advance(1),
            vec![(DspEvent::RaiseInterrupt, 0x8)]
        );
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn delivery_is_deadline_then_schedule_order() {
        let sched = ManualScheduler::new();
        sched.schedule(300, DspEvent::AramDmaComplete, 0, FromThread::Cpu);
        sched.schedule(100, DspEvent::RaiseInterrupt, 1, FromThread::Any);
        sched.schedule(100, DspEvent::RaiseInterrupt, 2, FromThread::Any);
        assert_eq!(
            sched.advance(500),
            vec![
                (DspEvent::RaiseInterrupt, 1),
                (DspEvent::RaiseInterrupt, 2),
                (DspEvent::AramDmaComplete, 0),
            ]
        );
    }

    #[test]
    fn deadlines_are_relative_to_schedule_time() {
        let sched = ManualScheduler::new();
        sched.advance(1000);
        sched.schedule(50, DspEvent::RaiseInterrupt, 0, FromThread::Any);
        assert_eq!(sched.next_deadline(), Some(1050));
    }
}
