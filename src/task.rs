//! Task data model and state machine (component E).
//!
//! `TaskSlot` is the arena element; `TaskId` is a generation-checked handle
//! into it (spec §9's suggested replacement for the validation-tag word).
//! The state machine itself — the table in spec §4.E — is implemented as
//! methods on [`crate::kernel::Kernel`] below, since every transition also
//! touches the ready queue (component C) and the timer wheel (component D)
//! that live on `Kernel`.

pub mod readyqueue;

use crate::error::*;
use crate::event_group::{EventGroupBits, EventGroupId, WaitMode};
use crate::kernel::{ExecContext, Kernel};
use crate::port::Port;
use crate::util::list::{ListAccessor, ListLink};
use crate::wait::WaitResult;
use crate::{Ticks, TICKS_INFINITE};

/// Numerically smaller is higher priority, per spec §3.
pub type Priority = usize;

/// A generation-checked handle to a task. Stale handles (pointing at a slot
/// since reused... though this crate's task arena is fixed at construction
/// and slots are never reused — see DESIGN.md) fail with `BadId` rather than
/// silently addressing the wrong task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub(crate) index: u16,
    pub(crate) generation: u16,
}

impl TaskId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

bitflags::bitflags! {
    /// The six legal combinations are DORMANT, RUNNABLE, WAIT, SUSPEND and
    /// WAIT|SUSPEND (spec §4.E). Predicates must always test with
    /// `contains`/`intersects`, never `==`, per spec §9's Open Question.
    pub struct TaskState: u8 {
        const RUNNABLE = 1 << 0;
        const WAIT     = 1 << 1;
        const SUSPEND  = 1 << 2;
        const DORMANT  = 1 << 3;
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::DORMANT
    }
}

/// Why a task is (or was) parked; carried even for subsystems this crate
/// does not implement, matching the source's single tagged union
/// (SPEC_FULL §10.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitReason {
    None,
    Sleep,
    Semaphore,
    Event,
    QueueSend,
    QueueReceive,
    MutexCeiling,
    MutexInherit,
    FixedMemory,
}

impl Default for WaitReason {
    fn default() -> Self {
        WaitReason::None
    }
}

/// Per-subsystem wait scratch (spec §3: "packed so at most one is live").
/// Only the event-group variant is populated by this crate; the others are
/// unreachable without their owning primitive, which is out of scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitScratch {
    None,
    EventGroup {
        requested_pattern: EventGroupBits,
        mode: WaitMode,
        /// Written by the waker at the moment of release (pre-image semantics).
        actual_pattern: EventGroupBits,
    },
}

impl Default for WaitScratch {
    fn default() -> Self {
        WaitScratch::None
    }
}

/// One task's full schedulable state (spec §3 "Task").
pub struct TaskSlot {
    pub(crate) generation: u16,
    pub(crate) deleted: bool,
    pub(crate) base_priority: Priority,
    pub(crate) priority: Priority,
    pub(crate) state: TaskState,
    pub(crate) wait_reason: WaitReason,
    pub(crate) wait_result: WaitResult,
    pub(crate) wait_scratch: WaitScratch,
    /// Back-pointer to the wait queue this task is parked on; `None` when
    /// not waiting on an object (covers plain `sleep`, which only uses the
    /// timer wheel).
    pub(crate) parked_on: Option<EventGroupId>,
    pub(crate) ticks_remaining: Ticks,
    pub(crate) slice_ticks: Ticks,
    pub(crate) entry: usize,
    pub(crate) param: usize,
    pub(crate) stack_base: usize,
    pub(crate) stack_size: usize,
    pub(crate) sp: usize,
    pub(crate) ready_link: ListLink,
    pub(crate) timer_link: ListLink,
    pub(crate) wait_link: ListLink,
}

/// Time-slice length granted to a task at each priority when the
/// `round_robin` feature is active.
pub const DEFAULT_TIME_SLICE: Ticks = 4;

impl TaskSlot {
    pub(crate) fn new_dormant(def: &TaskDef, generation: u16) -> Self {
        Self {
            generation,
            deleted: false,
            base_priority: def.priority,
            priority: def.priority,
            state: TaskState::DORMANT,
            wait_reason: WaitReason::None,
            wait_result: WaitResult::Ok,
            wait_scratch: WaitScratch::None,
            parked_on: None,
            ticks_remaining: TICKS_INFINITE,
            slice_ticks: DEFAULT_TIME_SLICE,
            entry: def.entry,
            param: def.param,
            stack_base: def.stack_base,
            stack_size: def.stack_size,
            sp: 0,
            ready_link: ListLink::UNLINKED,
            timer_link: ListLink::UNLINKED,
            wait_link: ListLink::UNLINKED,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test(def: TaskDef) -> Self {
        Self::new_dormant(&def, 1)
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn wait_reason(&self) -> WaitReason {
        self.wait_reason
    }
}

/// Static configuration for one task slot, supplied to
/// [`crate::kernel::Kernel::new`] (SPEC_FULL §10.3: the const-generic,
/// fixed-arena replacement for the source's runtime `tn_task_create`).
#[derive(Clone, Copy)]
pub struct TaskDef {
    pub priority: Priority,
    pub entry: usize,
    pub param: usize,
    pub stack_base: usize,
    pub stack_size: usize,
    /// Mirrors `TN_TASK_CREATE_OPT_START`: the task is RUNNABLE immediately
    /// instead of starting DORMANT.
    pub start_on_create: bool,
}

macro_rules! list_accessor {
    ($name:ident, $field:ident) => {
        pub(crate) struct $name<'a>(pub &'a mut [TaskSlot]);

        impl<'a> ListAccessor for $name<'a> {
            fn link(&self, index: usize) -> ListLink {
                self.0[index].$field
            }
            fn set_link(&mut self, index: usize, link: ListLink) {
                self.0[index].$field = link;
            }
        }
    };
}

list_accessor!(ReadyLinkAccessor, ready_link);
list_accessor!(TimerLinkAccessor, timer_link);
list_accessor!(WaitLinkAccessor, wait_link);

impl<const NT: usize, const NP: usize, const NE: usize, P: Port> Kernel<NT, NP, NE, P> {
    pub(crate) fn task_slot(&self, id: TaskId) -> Result<&TaskSlot, BadId> {
        let slot = self.tasks.get(id.index()).ok_or(BadId)?;
        if slot.deleted || slot.generation != id.generation {
            Err(BadId)
        } else {
            Ok(slot)
        }
    }

    pub(crate) fn task_slot_mut(&mut self, id: TaskId) -> Result<&mut TaskSlot, BadId> {
        let slot = self.tasks.get_mut(id.index()).ok_or(BadId)?;
        if slot.deleted || slot.generation != id.generation {
            Err(BadId)
        } else {
            Ok(slot)
        }
    }

    pub fn task_state(&self, id: TaskId) -> Result<TaskState, BadId> {
        Ok(self.task_slot(id)?.state)
    }

    pub fn task_priority(&self, id: TaskId) -> Result<Priority, BadId> {
        Ok(self.task_slot(id)?.priority)
    }

    fn expect_task_context(&self) -> Result<(), BadContext> {
        match self.context {
            ExecContext::Task => Ok(()),
            ExecContext::Isr => Err(BadContext),
        }
    }

    /// The mirror image of `expect_task_context`: for `i`-prefixed entry
    /// points that are only legal from interrupt context (spec §6's
    /// ILLEGAL_USE bucket, "ISR-only call from task context").
    fn expect_isr_context(&self) -> Result<(), IllegalUse> {
        match self.context {
            ExecContext::Isr => Ok(()),
            ExecContext::Task => Err(IllegalUse),
        }
    }

    /// Inserts `index` at the tail of its priority's ready list and sets
    /// that priority's bitmap bit (spec §4.C `push_tail`).
    pub(crate) fn ready_push_tail(&mut self, index: usize) {
        let priority = self.tasks[index].priority;
        self.ready.push_tail(&mut self.tasks, priority, index);
    }

    pub(crate) fn ready_remove(&mut self, index: usize) {
        let priority = self.tasks[index].priority;
        self.ready.remove(&mut self.tasks, priority, index);
    }

    /// Removes `index` from whichever queues it might currently be linked
    /// into (ready, wait, timer), tolerating a task that is in none of them.
    /// Used by `terminate_task`, which must be safe from an arbitrary state
    /// (spec §4.E: "must atomically remove the task from whatever queues it
    /// sits on").
    pub(crate) fn unlink_from_all_queues(&mut self, index: usize) {
        if self.tasks[index].state.contains(TaskState::RUNNABLE) {
            self.ready_remove(index);
        }
        if let Some(eg) = self.tasks[index].parked_on.take() {
            if let Some(slot) = self.event_groups.get_mut(eg.index()) {
                if slot.alive && slot.generation == eg.generation {
                    slot.wait_queue
                        .remove(&mut WaitLinkAccessor(&mut self.tasks), index);
                }
            }
        }
        self.timer.cancel(&mut self.tasks, index);
    }

    /// DORMANT -> RUNNABLE (spec §4.E row 1).
    pub fn activate_task(&mut self, id: TaskId) -> Result<(), ActivateTaskError> {
        self.expect_task_context().map_err(|_| ActivateTaskError::BadContext)?;
        self.activate_task_inner(id)
    }

    /// ISR-safe variant; enqueues a deferred action (spec §4.I).
    pub fn iactivate_task(&mut self, id: TaskId) -> Result<(), ActivateTaskError> {
        self.task_slot(id).map_err(|_| ActivateTaskError::BadId)?;
        self.isr.push(crate::isr::DeferredAction::ActivateTask(id));
        Ok(())
    }

    pub(crate) fn activate_task_inner(&mut self, id: TaskId) -> Result<(), ActivateTaskError> {
        let index = id.index();
        let slot = self.task_slot_mut(id).map_err(|_| ActivateTaskError::BadId)?;
        if slot.state != TaskState::DORMANT {
            return Err(ActivateTaskError::BadState);
        }
        slot.state = TaskState::RUNNABLE;
        slot.priority = slot.base_priority;
        slot.slice_ticks = DEFAULT_TIME_SLICE;
        self.ready_push_tail(index);
        #[cfg(test)]
        log::debug!("activate_task: {id:?} DORMANT -> RUNNABLE");
        self.reschedule();
        Ok(())
    }

    /// RUNNABLE -> SUSPEND, or WAIT -> WAIT|SUSPEND (spec §4.E rows "suspend").
    pub fn suspend_task(&mut self, id: TaskId) -> Result<(), SuspendTaskError> {
        self.expect_task_context().map_err(|_| SuspendTaskError::BadContext)?;
        let index = id.index();
        let slot = self.task_slot_mut(id).map_err(|_| SuspendTaskError::BadId)?;
        if slot.state.contains(TaskState::DORMANT) || slot.state.contains(TaskState::SUSPEND) {
            return Err(SuspendTaskError::BadState);
        }
        if slot.state.contains(TaskState::RUNNABLE) {
            self.ready_remove(index);
        }
        self.tasks[index].state.insert(TaskState::SUSPEND);
        self.tasks[index].state.remove(TaskState::RUNNABLE);
        self.reschedule();
        Ok(())
    }

    /// SUSPEND -> RUNNABLE, or WAIT|SUSPEND -> WAIT (spec §4.E rows "resume").
    pub fn resume_task(&mut self, id: TaskId) -> Result<(), ResumeTaskError> {
        self.expect_task_context().map_err(|_| ResumeTaskError::BadContext)?;
        let index = id.index();
        let slot = self.task_slot_mut(id).map_err(|_| ResumeTaskError::BadId)?;
        if !slot.state.contains(TaskState::SUSPEND) {
            return Err(ResumeTaskError::BadState);
        }
        let was_waiting = slot.state.contains(TaskState::WAIT);
        self.tasks[index].state.remove(TaskState::SUSPEND);
        if !was_waiting {
            self.tasks[index].state.insert(TaskState::RUNNABLE);
            self.ready_push_tail(index);
            self.reschedule();
        }
        Ok(())
    }

    /// Puts the calling task to sleep for `timeout` ticks. A pure timer
    /// wait with no backing object queue (spec §4.F step 3, "if timeout<∞
    /// push to timer wheel"); `current` must be set by the caller before
    /// invoking this (see `Kernel::run_current_to_block`).
    pub fn sleep(&mut self, current: TaskId, timeout: Ticks) -> Result<WaitResult, SleepError> {
        self.expect_task_context().map_err(|_| SleepError::BadContext)?;
        if self.current_task() != Some(current) {
            return Err(SleepError::BadContext);
        }
        let index = current.index();
        self.ready_remove(index);
        self.tasks[index].state.remove(TaskState::RUNNABLE);
        self.tasks[index].state.insert(TaskState::WAIT);
        self.tasks[index].wait_reason = WaitReason::Sleep;
        self.tasks[index].parked_on = None;
        if timeout < TICKS_INFINITE {
            self.tasks[index].ticks_remaining = timeout;
            self.timer.arm(&mut self.tasks, index, timeout);
        } else {
            self.tasks[index].ticks_remaining = TICKS_INFINITE;
        }
        self.reschedule();
        Ok(self.tasks[index].wait_result)
    }

    /// Undoes a plain `sleep` with result `Ok` (spec §4.E "release(rc)", here
    /// specialized to the `Sleep` wait reason, matching the source's
    /// distinct `tn_task_wakeup`).
    pub fn wakeup_task(&mut self, id: TaskId) -> Result<(), WakeupTaskError> {
        self.expect_task_context().map_err(|_| WakeupTaskError::BadContext)?;
        let slot = self.task_slot(id).map_err(|_| WakeupTaskError::BadId)?;
        if slot.wait_reason != WaitReason::Sleep || !slot.state.contains(TaskState::WAIT) {
            return Err(WakeupTaskError::BadState);
        }
        self.release(id.index(), WaitResult::Ok);
        self.reschedule();
        Ok(())
    }

    pub fn iwakeup_task(&mut self, id: TaskId) -> Result<(), WakeupTaskError> {
        self.expect_isr_context().map_err(|_| WakeupTaskError::IllegalUse)?;
        let slot = self.task_slot(id).map_err(|_| WakeupTaskError::BadId)?;
        if slot.wait_reason != WaitReason::Sleep || !slot.state.contains(TaskState::WAIT) {
            return Err(WakeupTaskError::BadState);
        }
        self.isr.push(crate::isr::DeferredAction::WakeupTask(id));
        Ok(())
    }

    /// Forced release of any waiting task with result `Forced` (spec §4.E
    /// "release(rc)", generic over wait reason; spec §5: non-waiting target
    /// returns WSTATE).
    pub fn release_wait(&mut self, id: TaskId) -> Result<(), ReleaseWaitError> {
        self.expect_task_context().map_err(|_| ReleaseWaitError::BadContext)?;
        let slot = self.task_slot(id).map_err(|_| ReleaseWaitError::BadId)?;
        if !slot.state.contains(TaskState::WAIT) {
            return Err(ReleaseWaitError::BadState);
        }
        self.release(id.index(), WaitResult::Forced);
        self.reschedule();
        Ok(())
    }

    pub fn irelease_wait(&mut self, id: TaskId) -> Result<(), ReleaseWaitError> {
        self.expect_isr_context().map_err(|_| ReleaseWaitError::IllegalUse)?;
        let slot = self.task_slot(id).map_err(|_| ReleaseWaitError::BadId)?;
        if !slot.state.contains(TaskState::WAIT) {
            return Err(ReleaseWaitError::BadState);
        }
        self.isr.push(crate::isr::DeferredAction::ReleaseWait(id));
        Ok(())
    }

    /// The running task exits to DORMANT (spec §4.E "R -> exit -> DORMANT").
    pub fn exit_task(&mut self, current: TaskId) -> Result<(), ExitTaskError> {
        self.expect_task_context().map_err(|_| ExitTaskError::BadContext)?;
        if self.current_task() != Some(current) {
            return Err(ExitTaskError::BadContext);
        }
        let index = current.index();
        self.ready_remove(index);
        self.tasks[index].state = TaskState::DORMANT;
        self.tasks[index].sp = 0;
        self.reschedule();
        Ok(())
    }

    /// Forces any non-DORMANT task back to DORMANT, unlinking it from every
    /// queue it might be on (spec §4.E "any non-D -> terminate -> DORMANT").
    pub fn terminate_task(&mut self, id: TaskId) -> Result<(), TerminateTaskError> {
        self.expect_task_context().map_err(|_| TerminateTaskError::BadContext)?;
        let index = id.index();
        let slot = self.task_slot(id).map_err(|_| TerminateTaskError::BadId)?;
        if slot.state == TaskState::DORMANT {
            return Err(TerminateTaskError::BadState);
        }
        self.unlink_from_all_queues(index);
        self.tasks[index].state = TaskState::DORMANT;
        self.tasks[index].sp = 0;
        self.reschedule();
        Ok(())
    }

    /// Only legal from DORMANT; clears the validation generation so the
    /// handle can never again address this slot (spec §3 task lifecycle).
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), DeleteTaskError> {
        self.expect_task_context().map_err(|_| DeleteTaskError::BadContext)?;
        let index = id.index();
        let slot = self.task_slot(id).map_err(|_| DeleteTaskError::BadId)?;
        if slot.state != TaskState::DORMANT {
            return Err(DeleteTaskError::BadState);
        }
        self.tasks[index].deleted = true;
        Ok(())
    }

    /// Changes a task's priority. Out of scope here is mutex-ceiling
    /// interaction (spec §1); a RUNNABLE task is repositioned in the ready
    /// queue at the new priority's tail.
    pub fn change_priority(&mut self, id: TaskId, priority: Priority) -> Result<(), ChangePriorityError> {
        self.expect_task_context().map_err(|_| ChangePriorityError::BadContext)?;
        if priority >= NP {
            return Err(ChangePriorityError::BadParam);
        }
        let index = id.index();
        let slot = self.task_slot(id).map_err(|_| ChangePriorityError::BadParam)?;
        if slot.state == TaskState::DORMANT {
            return Err(ChangePriorityError::BadState);
        }
        let was_runnable = slot.state.contains(TaskState::RUNNABLE);
        if was_runnable {
            self.ready_remove(index);
        }
        self.tasks[index].priority = priority;
        if was_runnable {
            self.ready_push_tail(index);
        }
        self.reschedule();
        Ok(())
    }

    /// The unifying primitive behind `wakeup_task`, `release_wait`, a timer
    /// expiry and an event-group `modify` (spec §4.F "release(rc)").
    /// `W -> R` unless `SUSPEND` is also set, in which case the task drops
    /// to plain `S` and stays off the ready queue (spec §4.E, the
    /// "release while suspended" row; scenario S6).
    pub(crate) fn release(&mut self, index: usize, result: WaitResult) {
        debug_assert!(self.tasks[index].state.contains(TaskState::WAIT));
        if let Some(eg) = self.tasks[index].parked_on.take() {
            if let Some(slot) = self.event_groups.get_mut(eg.index()) {
                if slot.alive && slot.generation == eg.generation {
                    slot.wait_queue
                        .remove(&mut WaitLinkAccessor(&mut self.tasks), index);
                }
            }
        }
        self.timer.cancel(&mut self.tasks, index);
        self.tasks[index].wait_result = result;
        self.tasks[index].wait_reason = WaitReason::None;
        self.tasks[index].state.remove(TaskState::WAIT);
        if self.tasks[index].state.contains(TaskState::SUSPEND) {
            // stays SUSPEND; not pushed to ready (scenario S6)
        } else {
            self.tasks[index].state.insert(TaskState::RUNNABLE);
            self.ready_push_tail(index);
        }
    }
}
