//! Generic wait-queue protocol (component F).
//!
//! Every blocking primitive in this crate follows the same three-phase
//! skeleton from spec §4.F: try to satisfy immediately; if polling, fail
//! immediately; otherwise park. [`park`] implements phase 3 — removing the
//! task from the ready queue, arming the timer wheel, and linking it onto
//! the caller-supplied queue — generically over which object owns that
//! queue, the way the source's `WaitQueue::wait_inner` is generic over
//! `WaitPayload`. [`event_group::Kernel::wait_event_group`] and friends
//! supply the event-group-specific predicate and own the FIFO wake walk,
//! since this crate implements only the one wait-queue owner named in
//! scope (a byte queue or mutex would reuse `park` the same way).

use crate::task::{TaskSlot, TaskState, WaitLinkAccessor, WaitReason, WaitScratch};
use crate::task::readyqueue::ReadyQueue;
use crate::timer::TimerWheel;
use crate::util::list::List;
use crate::{Ticks, TICKS_INFINITE};

/// Outcome written into a parked task's wait-result field by whoever wakes
/// it, and read back by the waiter once it resumes (spec §3, §5).
/// `Overflow` is reserved: spec §5 lists it among the wait-result codes but
/// no primitive implemented by this crate ever produces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    Ok,
    Timeout,
    Deleted,
    Forced,
}

/// Parks task `index` on `queue` with `reason`/`scratch` and, if `timeout`
/// is finite, on the timer wheel (spec §4.F phase 3). The caller is
/// responsible for phases 1 and 2 (immediate success, zero-timeout poll)
/// before calling this.
pub(crate) fn park<const NP: usize>(
    tasks: &mut [TaskSlot],
    ready: &mut ReadyQueue<NP>,
    queue: &mut List,
    timer: &mut TimerWheel,
    index: usize,
    reason: WaitReason,
    scratch: WaitScratch,
    timeout: Ticks,
) {
    let priority = tasks[index].priority;
    ready.remove(tasks, priority, index);
    tasks[index].state.remove(TaskState::RUNNABLE);
    tasks[index].state.insert(TaskState::WAIT);
    tasks[index].wait_reason = reason;
    tasks[index].wait_scratch = scratch;
    queue.push_back(&mut WaitLinkAccessor(tasks), index);
    if timeout < TICKS_INFINITE {
        tasks[index].ticks_remaining = timeout;
        timer.arm(tasks, index, timeout);
    } else {
        tasks[index].ticks_remaining = TICKS_INFINITE;
    }
}
