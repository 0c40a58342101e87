//! Ready queue (component C): per-priority FIFO lists plus a bitmap of
//! non-empty priorities, grounded on the teacher's `BitmapQueue`
//! (`r3_kernel/src/task/readyqueue.rs`) but sized by a single `NP` const
//! generic instead of a two-level bitmap, since spec §4.C only calls for
//! "a word-sized bitmap".

use super::{Priority, ReadyLinkAccessor, TaskSlot};
use crate::util::list::List;
use crate::util::prio_bitmap::PrioBitmap;

/// Highest priority = numerically lowest index (spec §3).
pub struct ReadyQueue<const NP: usize> {
    lists: [List; NP],
    bitmap: PrioBitmap<NP>,
}

impl<const NP: usize> ReadyQueue<NP> {
    pub const fn new() -> Self {
        Self {
            lists: [List::EMPTY; NP],
            bitmap: PrioBitmap::EMPTY,
        }
    }

    pub fn push_tail(&mut self, tasks: &mut [TaskSlot], priority: Priority, index: usize) {
        self.lists[priority].push_back(&mut ReadyLinkAccessor(tasks), index);
        self.bitmap.set(priority);
    }

    pub fn push_head(&mut self, tasks: &mut [TaskSlot], priority: Priority, index: usize) {
        self.lists[priority].push_front(&mut ReadyLinkAccessor(tasks), index);
        self.bitmap.set(priority);
    }

    pub fn remove(&mut self, tasks: &mut [TaskSlot], priority: Priority, index: usize) {
        self.lists[priority].remove(&mut ReadyLinkAccessor(tasks), index);
        if self.lists[priority].is_empty() {
            self.bitmap.clear(priority);
        }
    }

    /// Find-first-set on the bitmap (spec §4.C `highest_priority`).
    pub fn highest_priority(&self) -> Option<Priority> {
        self.bitmap.find_set()
    }

    /// The frontmost task at `priority` (spec §4.C `head_of`, the
    /// tie-break rule for `highest_priority`).
    pub fn head_of(&self, priority: Priority) -> Option<usize> {
        self.lists[priority].front()
    }

    /// Rotates the task at the head of `priority` to the tail. Called by
    /// the tick handler when the running task's time slice reaches zero
    /// (spec §4.C, gated behind the `round_robin` feature).
    pub fn rotate(&mut self, tasks: &mut [TaskSlot], priority: Priority) {
        if let Some(head) = self.lists[priority].pop_front(&mut ReadyLinkAccessor(tasks)) {
            self.lists[priority].push_back(&mut ReadyLinkAccessor(tasks), head);
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn list_is_empty(&self, priority: Priority) -> bool {
        self.lists[priority].is_empty()
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn bitmap_bit(&self, priority: Priority) -> bool {
        self.bitmap.get(priority)
    }
}
