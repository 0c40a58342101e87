//! ISR-safe deferred action queue (component I).
//!
//! `i`-prefixed entry points (`iactivate_task`, `iwakeup_task`,
//! `irelease_wait`, `imodify_event_group`, ...) validate their arguments and
//! push a record here instead of running the primitive body directly, since
//! a primitive that might need to pick a new `current` task cannot safely
//! request a context switch mid-ISR. The scheduler drains the ring and
//! performs the actions, as if from task context with interrupts disabled,
//! before it leaves the outermost critical section (spec §4.I).

use crate::event_group::{EventGroupBits, EventGroupId, ModifyOp};
use crate::task::TaskId;
use arrayvec::ArrayVec;

/// One queued deferred action. `{kind, target, arg}` from spec §3, modeled
/// as an enum instead of a generic triple since each ISR entry point has a
/// fixed, small argument shape.
#[derive(Clone, Copy, Debug)]
pub enum DeferredAction {
    ActivateTask(TaskId),
    WakeupTask(TaskId),
    ReleaseWait(TaskId),
    ModifyEventGroup(EventGroupId, ModifyOp, EventGroupBits),
}

/// Capacity of the deferred-action ring. Sized generously for a
/// single-controller workload; exhaustion is a programming error (too many
/// ISRs firing between drains) rather than a condition the kernel can
/// usefully recover from, so `push` drops the oldest record rather than
/// blocking or panicking from interrupt context.
pub const ISR_QUEUE_CAPACITY: usize = 32;

#[derive(Default)]
pub struct IsrQueue {
    ring: ArrayVec<DeferredAction, ISR_QUEUE_CAPACITY>,
}

impl IsrQueue {
    pub fn new() -> Self {
        Self { ring: ArrayVec::new() }
    }

    pub fn push(&mut self, action: DeferredAction) {
        if self.ring.is_full() {
            self.ring.remove(0);
        }
        self.ring.push(action);
    }

    pub fn drain(&mut self) -> arrayvec::IntoIter<DeferredAction, ISR_QUEUE_CAPACITY> {
        core::mem::take(&mut self.ring).into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(index: u16) -> TaskId {
        TaskId { index, generation: 1 }
    }

    #[test]
    fn drain_yields_actions_in_fifo_order() {
        let mut q = IsrQueue::new();
        q.push(DeferredAction::WakeupTask(tid(0)));
        q.push(DeferredAction::WakeupTask(tid(1)));
        let drained: Vec<_> = q.drain().collect();
        assert_eq!(drained.len(), 2);
        match (&drained[0], &drained[1]) {
            (DeferredAction::WakeupTask(a), DeferredAction::WakeupTask(b)) => {
                assert_eq!(a.index(), 0);
                assert_eq!(b.index(), 1);
            }
            _ => panic!("unexpected action kind"),
        }
        assert!(q.is_empty());
    }

    #[test]
    fn overflow_drops_the_oldest_record() {
        let mut q = IsrQueue::new();
        for i in 0..(ISR_QUEUE_CAPACITY as u16 + 1) {
            q.push(DeferredAction::WakeupTask(tid(i)));
        }
        let drained: Vec<_> = q.drain().collect();
        assert_eq!(drained.len(), ISR_QUEUE_CAPACITY);
        match &drained[0] {
            DeferredAction::WakeupTask(t) => {
                assert_eq!(t.index(), 1, "oldest record (index 0) must be dropped")
            }
            _ => panic!("unexpected action kind"),
        }
    }

    #[test]
    fn push_after_drain_starts_a_fresh_ring() {
        let mut q = IsrQueue::new();
        q.push(DeferredAction::WakeupTask(tid(0)));
        let _ = q.drain().collect::<Vec<_>>();
        assert!(q.is_empty());
        q.push(DeferredAction::WakeupTask(tid(5)));
        let drained: Vec<_> = q.drain().collect();
        match &drained[..] {
            [DeferredAction::WakeupTask(t)] => assert_eq!(t.index(), 5),
            _ => panic!("unexpected contents"),
        }
    }
}
