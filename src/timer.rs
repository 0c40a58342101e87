//! Timer wheel (component D).
//!
//! Spec §4.D explicitly allows "the simpler non-sorted variant" where the
//! tick handler decrements every entry, in preference to the teacher's
//! wraparound-safe binary-heap `timeout.rs`; see DESIGN.md for why that
//! simplification was taken here. This module owns only list membership —
//! the actual countdown (`ticks_remaining`) lives on `TaskSlot`, matching
//! spec §3 ("ticks remaining until timeout... embedded list hooks: ...one
//! for the timer queue").

use crate::task::{TaskSlot, TimerLinkAccessor};
use crate::util::list::{List, ListAccessor};
use crate::Ticks;

/// A single FIFO-ordered list of tasks with a finite timeout armed.
pub struct TimerWheel {
    list: List,
}

impl TimerWheel {
    pub const fn new() -> Self {
        Self { list: List::EMPTY }
    }

    /// Arms `index`'s timeout for `ticks` (must be < `TICKS_INFINITE`;
    /// callers are expected to have already written `ticks` into
    /// `tasks[index].ticks_remaining`).
    pub fn arm(&mut self, tasks: &mut [TaskSlot], index: usize, _ticks: Ticks) {
        self.list.push_back(&mut TimerLinkAccessor(tasks), index);
    }

    /// The task at the front of the timer queue, if any. Exposed only for
    /// the invariant-checking code in `Kernel::check_invariants`.
    pub(crate) fn front(&self) -> Option<usize> {
        self.list.front()
    }

    /// Disarms `index`'s timeout, if any. A no-op if it was not armed
    /// (spec §4.A: removing an unlinked node is a no-op).
    pub fn cancel(&mut self, tasks: &mut [TaskSlot], index: usize) {
        self.list.remove(&mut TimerLinkAccessor(tasks), index);
    }

    /// Advances every armed timeout by one tick. For each that reaches
    /// zero, unlinks it from the timer queue and invokes `on_expire`, which
    /// is responsible for the wait-queue/state-machine side of expiry
    /// (spec §4.D: "dequeue the task from both the timer queue and its wait
    /// queue, write 'timeout' into its wait result code, and transition its
    /// state toward RUNNABLE via E").
    pub fn tick(&mut self, tasks: &mut [TaskSlot], mut on_expire: impl FnMut(&mut [TaskSlot], usize)) {
        let mut cur = self.list.front();
        while let Some(index) = cur {
            let next = TimerLinkAccessor(tasks).link(index).next();
            tasks[index].ticks_remaining = tasks[index].ticks_remaining.saturating_sub(1);
            if tasks[index].ticks_remaining == 0 {
                self.list.remove(&mut TimerLinkAccessor(tasks), index);
                on_expire(tasks, index);
            }
            cur = next;
        }
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskDef, TaskSlot};

    fn make_tasks(n: usize) -> Vec<TaskSlot> {
        (0..n)
            .map(|_| {
                crate::task::TaskSlot::for_test(TaskDef {
                    priority: 0,
                    entry: 0,
                    param: 0,
                    stack_base: 0,
                    stack_size: 0,
                    start_on_create: false,
                })
            })
            .collect()
    }

    #[test]
    fn expires_after_exact_tick_count() {
        let mut tasks = make_tasks(2);
        tasks[0].ticks_remaining = 3;
        let mut wheel = TimerWheel::new();
        wheel.arm(&mut tasks, 0, 3);

        let mut expired = Vec::new();
        for _ in 0..2 {
            wheel.tick(&mut tasks, |_, i| expired.push(i));
        }
        assert!(expired.is_empty());
        wheel.tick(&mut tasks, |_, i| expired.push(i));
        assert_eq!(expired, vec![0]);
    }

    #[test]
    fn cancel_before_expiry_prevents_callback() {
        let mut tasks = make_tasks(1);
        tasks[0].ticks_remaining = 2;
        let mut wheel = TimerWheel::new();
        wheel.arm(&mut tasks, 0, 2);
        wheel.cancel(&mut tasks, 0);

        let mut expired = Vec::new();
        wheel.tick(&mut tasks, |_, i| expired.push(i));
        wheel.tick(&mut tasks, |_, i| expired.push(i));
        assert!(expired.is_empty());
    }

    #[test]
    fn multiple_entries_expire_independently() {
        let mut tasks = make_tasks(2);
        tasks[0].ticks_remaining = 1;
        tasks[1].ticks_remaining = 2;
        let mut wheel = TimerWheel::new();
        wheel.arm(&mut tasks, 0, 1);
        wheel.arm(&mut tasks, 1, 2);

        let mut expired = Vec::new();
        wheel.tick(&mut tasks, |_, i| expired.push(i));
        assert_eq!(expired, vec![0]);
        expired.clear();
        wheel.tick(&mut tasks, |_, i| expired.push(i));
        assert_eq!(expired, vec![1]);
    }
}
