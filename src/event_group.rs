//! Event group (component H): a bit pattern plus a wait queue, the
//! exemplar consumer of the wait-queue protocol (component F).
//!
//! Grounded on the teacher's `event_group.rs` (`poll_core`'s OR/AND
//! predicate) for the wait side, and on TNeo's `tn_eventgrp.h` for the
//! SET/CLEAR/TOGGLE `modify` contract, which the teacher's own
//! `event_group.rs` does not show in one place (its `set`/`clear` are split
//! across that file and `KernelEventGroup`'s inline methods).

use crate::error::*;
use crate::isr::DeferredAction;
use crate::kernel::{ExecContext, Kernel};
use crate::port::Port;
use crate::task::{TaskId, TaskSlot, WaitLinkAccessor, WaitReason, WaitScratch};
use crate::util::list::{List, ListAccessor};
use crate::wait::{self, WaitResult};
use crate::{Ticks, TICKS_INFINITE};

/// The event group's bit pattern. Spec §3 calls for "an unsigned machine
/// word"; `u32` comfortably covers the flag counts real applications use
/// and matches the teacher's `EventGroupBits`.
pub type EventGroupBits = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitMode {
    Or,
    And,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifyOp {
    Set,
    Clear,
    Toggle,
}

/// A generation-checked handle to an event group (spec §9's validation-tag
/// replacement).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventGroupId {
    pub(crate) index: u16,
    pub(crate) generation: u16,
}

impl EventGroupId {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Clone, Copy)]
pub(crate) struct EventGroupSlot {
    pub(crate) generation: u16,
    pub(crate) alive: bool,
    pub(crate) pattern: EventGroupBits,
    pub(crate) wait_queue: List,
}

impl EventGroupSlot {
    pub(crate) const fn empty() -> Self {
        Self {
            generation: 0,
            alive: false,
            pattern: 0,
            wait_queue: List::EMPTY,
        }
    }
}

/// Does `current` satisfy a waiter asking for `pattern` under `mode`
/// (spec §4.H `wait`)?
fn satisfies(current: EventGroupBits, pattern: EventGroupBits, mode: WaitMode) -> bool {
    match mode {
        WaitMode::Or => current & pattern != 0,
        WaitMode::And => current & pattern == pattern,
    }
}

impl<const NT: usize, const NP: usize, const NE: usize, P: Port> Kernel<NT, NP, NE, P> {
    pub(crate) fn event_group_slot(&self, id: EventGroupId) -> Result<&EventGroupSlot, BadId> {
        let slot = self.event_groups.get(id.index()).ok_or(BadId)?;
        if !slot.alive || slot.generation != id.generation {
            Err(BadId)
        } else {
            Ok(slot)
        }
    }

    pub(crate) fn event_group_slot_mut(&mut self, id: EventGroupId) -> Result<&mut EventGroupSlot, BadId> {
        let slot = self.event_groups.get_mut(id.index()).ok_or(BadId)?;
        if !slot.alive || slot.generation != id.generation {
            Err(BadId)
        } else {
            Ok(slot)
        }
    }

    pub fn event_group_pattern(&self, id: EventGroupId) -> Result<EventGroupBits, BadId> {
        Ok(self.event_group_slot(id)?.pattern)
    }

    /// Allocates a free slot and initializes it with `initial_pattern`
    /// (spec §4.H `create`). Unlike the source, which creates over
    /// caller-provided static storage and so cannot run out of room, this
    /// crate's event groups live in a fixed-size arena of `NE` slots.
    pub fn create_event_group(&mut self, initial_pattern: EventGroupBits) -> Result<EventGroupId, CreateEventGroupError> {
        if self.context == ExecContext::Isr {
            return Err(CreateEventGroupError::BadContext);
        }
        let (index, generation) = self
            .event_groups
            .iter()
            .enumerate()
            .find(|(_, slot)| !slot.alive)
            .map(|(i, slot)| (i, slot.generation))
            .ok_or(CreateEventGroupError::SlotsExhausted)?;
        let new_generation = generation.wrapping_add(1).max(1);
        self.event_groups[index] = EventGroupSlot {
            generation: new_generation,
            alive: true,
            pattern: initial_pattern,
            wait_queue: List::EMPTY,
        };
        Ok(EventGroupId {
            index: index as u16,
            generation: new_generation,
        })
    }

    /// Releases every parked waiter with `Deleted` and frees the slot
    /// (spec §4.H `delete`).
    pub fn delete_event_group(&mut self, id: EventGroupId) -> Result<(), DeleteEventGroupError> {
        if self.context == ExecContext::Isr {
            return Err(DeleteEventGroupError::BadContext);
        }
        self.event_group_slot(id).map_err(|_| DeleteEventGroupError::BadId)?;
        self.release_all_waiters(id, WaitResult::Deleted);
        let slot = self.event_group_slot_mut(id).map_err(|_| DeleteEventGroupError::BadId)?;
        slot.alive = false;
        slot.pattern = 0;
        self.reschedule();
        Ok(())
    }

    fn release_all_waiters(&mut self, id: EventGroupId, result: WaitResult) {
        let mut cur = match self.event_group_slot(id) {
            Ok(slot) => slot.wait_queue.front(),
            Err(_) => return,
        };
        while let Some(index) = cur {
            let next = WaitLinkAccessor(&mut self.tasks).link(index).next();
            self.release(index, result);
            cur = next;
        }
    }

    /// Blocking wait with no timeout bound (spec §4.H `wait`, timeout=∞).
    pub fn wait_event_group(
        &mut self,
        current: TaskId,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
    ) -> Result<EventGroupBits, WaitEventGroupError> {
        if self.context == ExecContext::Isr {
            return Err(WaitEventGroupError::BadContext);
        }
        match self.wait_event_group_inner(current, id, pattern, mode, TICKS_INFINITE) {
            Ok(v) => Ok(v),
            Err(WaitOutcome::BadParam) => Err(WaitEventGroupError::BadParam),
            Err(WaitOutcome::Deleted) => Err(WaitEventGroupError::Deleted),
            Err(WaitOutcome::Forced) => Err(WaitEventGroupError::Forced),
            Err(WaitOutcome::Timeout) => unreachable!("infinite timeout cannot expire"),
        }
    }

    /// Blocking wait bounded by `timeout` ticks (spec §4.H `wait`).
    pub fn wait_event_group_timeout(
        &mut self,
        current: TaskId,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
        timeout: Ticks,
    ) -> Result<EventGroupBits, WaitEventGroupTimeoutError> {
        if self.context == ExecContext::Isr {
            return Err(WaitEventGroupTimeoutError::BadContext);
        }
        self.wait_event_group_inner(current, id, pattern, mode, timeout)
            .map_err(|e| match e {
                WaitOutcome::BadParam => WaitEventGroupTimeoutError::BadParam,
                WaitOutcome::Deleted => WaitEventGroupTimeoutError::Deleted,
                WaitOutcome::Forced => WaitEventGroupTimeoutError::Forced,
                WaitOutcome::Timeout => WaitEventGroupTimeoutError::Timeout,
            })
    }

    /// Never parks (spec §4.H `wait_polling`): same predicate, timeout=0.
    pub fn wait_event_group_polling(
        &mut self,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
    ) -> Result<EventGroupBits, WaitEventGroupPollingError> {
        if self.context == ExecContext::Isr {
            return Err(WaitEventGroupPollingError::BadContext);
        }
        self.poll_inner(id, pattern, mode)
    }

    /// The ISR-safe variant of `wait_event_group_polling`; identical
    /// contract, callable only from interrupt context, never parks (spec
    /// §4.H `iwait_polling`).
    pub fn iwait_event_group_polling(
        &mut self,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
    ) -> Result<EventGroupBits, WaitEventGroupPollingError> {
        if self.context != ExecContext::Isr {
            return Err(WaitEventGroupPollingError::IllegalUse);
        }
        self.poll_inner(id, pattern, mode)
    }

    fn poll_inner(
        &mut self,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
    ) -> Result<EventGroupBits, WaitEventGroupPollingError> {
        let slot = self.event_group_slot(id).map_err(|_| WaitEventGroupPollingError::BadParam)?;
        if pattern == 0 {
            return Err(WaitEventGroupPollingError::BadParam);
        }
        if satisfies(slot.pattern, pattern, mode) {
            Ok(slot.pattern)
        } else {
            Err(WaitEventGroupPollingError::Timeout)
        }
    }

    fn wait_event_group_inner(
        &mut self,
        current: TaskId,
        id: EventGroupId,
        pattern: EventGroupBits,
        mode: WaitMode,
        timeout: Ticks,
    ) -> Result<EventGroupBits, WaitOutcome> {
        if pattern == 0 {
            return Err(WaitOutcome::BadParam);
        }
        let slot = self.event_group_slot(id).map_err(|_| WaitOutcome::BadParam)?;
        // Phase 1: try to satisfy immediately.
        if satisfies(slot.pattern, pattern, mode) {
            return Ok(slot.pattern);
        }
        // Phase 2: poll (timeout == 0) fails immediately instead of parking.
        if timeout == 0 {
            return Err(WaitOutcome::Timeout);
        }
        // Phase 3: park.
        let index = current.index();
        let scratch = WaitScratch::EventGroup {
            requested_pattern: pattern,
            mode,
            actual_pattern: 0,
        };
        {
            let slot = self
                .event_groups
                .get_mut(id.index())
                .expect("validated above");
            wait::park(
                &mut self.tasks,
                &mut self.ready,
                &mut slot.wait_queue,
                &mut self.timer,
                index,
                WaitReason::Event,
                scratch,
                timeout,
            );
        }
        self.tasks[index].parked_on = Some(id);
        self.reschedule();

        match self.tasks[index].wait_result {
            WaitResult::Ok => match self.tasks[index].wait_scratch {
                WaitScratch::EventGroup { actual_pattern, .. } => Ok(actual_pattern),
                _ => unreachable!("event-group wait scratch overwritten"),
            },
            WaitResult::Timeout => Err(WaitOutcome::Timeout),
            WaitResult::Deleted => Err(WaitOutcome::Deleted),
            WaitResult::Forced => Err(WaitOutcome::Forced),
        }
    }

    /// SET/CLEAR/TOGGLE the pattern, then wake every waiter whose predicate
    /// the new pattern now satisfies (spec §4.H `modify`).
    pub fn modify_event_group(&mut self, id: EventGroupId, op: ModifyOp, pattern: EventGroupBits) -> Result<(), ModifyEventGroupError> {
        if self.context == ExecContext::Isr {
            return Err(ModifyEventGroupError::BadContext);
        }
        let slot = self.event_group_slot_mut(id).map_err(|_| ModifyEventGroupError::BadId)?;
        slot.pattern = match op {
            ModifyOp::Set => slot.pattern | pattern,
            ModifyOp::Clear => slot.pattern & !pattern,
            ModifyOp::Toggle => slot.pattern ^ pattern,
        };
        self.wake_satisfied_waiters(id);
        self.reschedule();
        Ok(())
    }

    /// ISR variant; enqueues a deferred action processed at ISR exit
    /// (spec §4.H `imodify`).
    pub fn imodify_event_group(&mut self, id: EventGroupId, op: ModifyOp, pattern: EventGroupBits) -> Result<(), ModifyEventGroupError> {
        if self.context != ExecContext::Isr {
            return Err(ModifyEventGroupError::IllegalUse);
        }
        self.event_group_slot(id).map_err(|_| ModifyEventGroupError::BadId)?;
        self.isr.push(DeferredAction::ModifyEventGroup(id, op, pattern));
        Ok(())
    }

    /// Walks the wait queue in FIFO parking order (spec §4.H: "Ordering:
    /// waiters are checked in FIFO parking order"); every waiter whose
    /// predicate the current pattern now satisfies is released with `Ok`
    /// and the pre-image pattern recorded into its scratch. Unlike a
    /// semaphore's wake walk, an event group's waiters are independent —
    /// one waiter's mismatch says nothing about the next — so this always
    /// walks the whole queue rather than stopping early.
    fn wake_satisfied_waiters(&mut self, id: EventGroupId) {
        let pattern = match self.event_group_slot(id) {
            Ok(slot) => slot.pattern,
            Err(_) => return,
        };
        let mut cur = match self.event_group_slot(id) {
            Ok(slot) => slot.wait_queue.front(),
            Err(_) => return,
        };
        while let Some(index) = cur {
            let next = WaitLinkAccessor(&mut self.tasks).link(index).next();
            let matched = match self.tasks[index].wait_scratch {
                WaitScratch::EventGroup {
                    requested_pattern,
                    mode,
                    ..
                } => satisfies(pattern, requested_pattern, mode),
                WaitScratch::None => false,
            };
            if matched {
                if let WaitScratch::EventGroup {
                    requested_pattern,
                    mode,
                    ..
                } = self.tasks[index].wait_scratch
                {
                    self.tasks[index].wait_scratch = WaitScratch::EventGroup {
                        requested_pattern,
                        mode,
                        actual_pattern: pattern,
                    };
                }
                self.release(index, WaitResult::Ok);
            }
            cur = next;
        }
    }
}

/// Internal error shape for the timeout-agnostic inner wait, mapped onto
/// the per-operation public error types at the call site.
enum WaitOutcome {
    BadParam,
    Deleted,
    Forced,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NullPort;
    use crate::task::{TaskDef, TaskState};

    fn def(priority: usize) -> TaskDef {
        TaskDef {
            priority,
            entry: 0,
            param: 0,
            stack_base: 0,
            stack_size: 0x100,
            start_on_create: true,
        }
    }

    /// A kernel with one task per entry of `prios`, all RUNNABLE, and two
    /// spare event-group slots.
    fn kernel<const NT: usize>(prios: [usize; NT]) -> Kernel<NT, 8, 2, NullPort> {
        let defs = core::array::from_fn(|i| def(prios[i]));
        Kernel::new(NullPort::default(), defs)
    }

    fn tid<const NT: usize, const NP: usize, const NE: usize, P: Port>(
        k: &Kernel<NT, NP, NE, P>,
        index: usize,
    ) -> TaskId {
        TaskId {
            index: index as u16,
            generation: k.tasks[index].generation,
        }
    }

    #[test]
    fn create_then_delete_frees_the_slot_for_reuse() {
        let mut k = kernel([5, 6]);
        let eg1 = k.create_event_group(0x00).unwrap();
        k.delete_event_group(eg1).unwrap();
        assert_eq!(k.event_group_pattern(eg1), Err(BadId));

        let eg2 = k.create_event_group(0x00).unwrap();
        assert_eq!(eg2.index(), eg1.index());
        assert_ne!(eg2.generation, eg1.generation);
    }

    #[test]
    fn create_fails_when_slots_exhausted() {
        let mut k: Kernel<2, 8, 1, NullPort> = Kernel::new(NullPort::default(), [def(5), def(6)]);
        let _eg = k.create_event_group(0).unwrap();
        assert_eq!(k.create_event_group(0), Err(CreateEventGroupError::SlotsExhausted));
    }

    #[test]
    fn delete_unknown_event_group_is_bad_id() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        k.delete_event_group(eg).unwrap();
        assert_eq!(k.delete_event_group(eg), Err(DeleteEventGroupError::BadId));
    }

    /// S1: an OR wait is satisfied as soon as any requested bit appears.
    #[test]
    fn scenario_or_wait_satisfied_by_set() {
        let mut k = kernel([5, 6]);
        let t1 = tid(&k, 0);
        let eg = k.create_event_group(0x00).unwrap();

        // Parks t1; the call's own return value reflects the pre-park state
        // (no real context switch happens under `NullPort`), so the
        // meaningful assertions are on the state `modify_event_group` leaves
        // behind, inspected directly below.
        let _ = k.wait_event_group_timeout(t1, eg, 0x06, WaitMode::Or, TICKS_INFINITE);
        assert_eq!(k.task_state(t1).unwrap(), TaskState::WAIT);
        assert_eq!(k.current_task(), Some(tid(&k, 1)));
        k.check_invariants();

        k.modify_event_group(eg, ModifyOp::Set, 0x02).unwrap();

        assert_eq!(k.task_state(t1).unwrap(), TaskState::RUNNABLE);
        let slot = k.task_slot(t1).unwrap();
        assert_eq!(slot.wait_result, WaitResult::Ok);
        match slot.wait_scratch {
            WaitScratch::EventGroup { actual_pattern, .. } => assert_eq!(actual_pattern, 0x02),
            WaitScratch::None => panic!("expected event-group scratch"),
        }
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x02);
        assert_eq!(k.current_task(), Some(t1));
        k.check_invariants();
    }

    /// S2: an AND wait needs every requested bit; a single SET is not enough.
    #[test]
    fn scenario_and_wait_needs_both_bits() {
        let mut k = kernel([5, 6]);
        let t1 = tid(&k, 0);
        let eg = k.create_event_group(0x00).unwrap();
        let _ = k.wait_event_group_timeout(t1, eg, 0x03, WaitMode::And, TICKS_INFINITE);

        k.modify_event_group(eg, ModifyOp::Set, 0x01).unwrap();
        assert_eq!(k.task_state(t1).unwrap(), TaskState::WAIT, "one bit must not satisfy AND");
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x01);

        k.modify_event_group(eg, ModifyOp::Set, 0x02).unwrap();
        assert_eq!(k.task_state(t1).unwrap(), TaskState::RUNNABLE);
        match k.task_slot(t1).unwrap().wait_scratch {
            WaitScratch::EventGroup { actual_pattern, .. } => assert_eq!(actual_pattern, 0x03),
            WaitScratch::None => panic!("expected event-group scratch"),
        }
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x03);
        k.check_invariants();
    }

    /// S3: ten ticks elapse with no modify; the waiter times out.
    #[test]
    fn scenario_timeout_with_no_modify() {
        let mut k = kernel([5, 6]);
        let t1 = tid(&k, 0);
        let eg = k.create_event_group(0x00).unwrap();
        let _ = k.wait_event_group_timeout(t1, eg, 0x01, WaitMode::Or, 10);

        for _ in 0..9 {
            k.tick();
            assert_eq!(k.task_state(t1).unwrap(), TaskState::WAIT);
        }
        k.tick();
        assert_eq!(k.task_state(t1).unwrap(), TaskState::RUNNABLE);
        assert_eq!(k.task_slot(t1).unwrap().wait_result, WaitResult::Timeout);
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x00);
        k.check_invariants();
    }

    /// S4: deleting the event group wakes every parked waiter with `Deleted`.
    #[test]
    fn scenario_delete_wakes_all_parked_waiters_deleted() {
        let mut k = kernel([5, 6, 7]);
        let eg = k.create_event_group(0xFF).unwrap();
        let waiters = [tid(&k, 0), tid(&k, 1), tid(&k, 2)];
        for t in waiters {
            let _ = k.wait_event_group_timeout(t, eg, 0x100, WaitMode::And, TICKS_INFINITE);
            assert_eq!(k.task_state(t).unwrap(), TaskState::WAIT);
        }

        k.delete_event_group(eg).unwrap();

        for t in waiters {
            assert_eq!(k.task_state(t).unwrap(), TaskState::RUNNABLE);
            assert_eq!(k.task_slot(t).unwrap().wait_result, WaitResult::Deleted);
        }
        assert_eq!(k.event_group_pattern(eg), Err(BadId));
        k.check_invariants();
    }

    /// S5 (equal priority): waiters released by the same `modify` keep their
    /// parking order on the ready queue.
    #[test]
    fn scenario_fifo_wakeup_preserves_parking_order_at_equal_priority() {
        let mut k = kernel([7, 5, 5]);
        let eg = k.create_event_group(0x00).unwrap();
        let a = tid(&k, 1);
        let b = tid(&k, 2);
        let _ = k.wait_event_group_timeout(a, eg, 0x01, WaitMode::Or, TICKS_INFINITE);
        let _ = k.wait_event_group_timeout(b, eg, 0x01, WaitMode::Or, TICKS_INFINITE);

        k.modify_event_group(eg, ModifyOp::Set, 0x01).unwrap();

        assert_eq!(k.task_state(a).unwrap(), TaskState::RUNNABLE);
        assert_eq!(k.task_state(b).unwrap(), TaskState::RUNNABLE);
        assert_eq!(k.ready.head_of(5), Some(a.index()));
        assert_eq!(k.tasks[a.index()].ready_link.next(), Some(b.index()));
        k.check_invariants();
    }

    /// S5 (unequal priority): the higher-priority waiter preempts on wake
    /// even though it parked second.
    #[test]
    fn scenario_higher_priority_waiter_preempts_despite_parking_second() {
        let mut k = kernel([7, 6, 5]);
        let eg = k.create_event_group(0x00).unwrap();
        let b = tid(&k, 1);
        let a = tid(&k, 2);
        let _ = k.wait_event_group_timeout(b, eg, 0x01, WaitMode::Or, TICKS_INFINITE);
        let _ = k.wait_event_group_timeout(a, eg, 0x01, WaitMode::Or, TICKS_INFINITE);

        k.modify_event_group(eg, ModifyOp::Set, 0x01).unwrap();

        assert_eq!(k.task_state(a).unwrap(), TaskState::RUNNABLE);
        assert_eq!(k.task_state(b).unwrap(), TaskState::RUNNABLE);
        assert_eq!(
            k.current_task(),
            Some(a),
            "higher priority waiter preempts regardless of parking order"
        );
        k.check_invariants();
    }

    /// S6: a modify that would satisfy a WAIT|SUSPEND task's predicate
    /// releases its wait (recording the result) but leaves it SUSPEND, not
    /// RUNNABLE, until an explicit resume.
    #[test]
    fn scenario_modify_release_while_suspended_keeps_task_parked_suspended() {
        let mut k = kernel([7, 5]);
        let t1 = tid(&k, 1);
        let eg = k.create_event_group(0x00).unwrap();

        let _ = k.wait_event_group_timeout(t1, eg, 0x01, WaitMode::Or, TICKS_INFINITE);
        k.suspend_task(t1).unwrap();
        assert_eq!(k.task_state(t1).unwrap(), TaskState::WAIT | TaskState::SUSPEND);

        k.modify_event_group(eg, ModifyOp::Set, 0x01).unwrap();

        assert_eq!(k.task_state(t1).unwrap(), TaskState::SUSPEND);
        let slot = k.task_slot(t1).unwrap();
        assert_eq!(slot.wait_result, WaitResult::Ok);
        match slot.wait_scratch {
            WaitScratch::EventGroup { actual_pattern, .. } => assert_eq!(actual_pattern, 0x01),
            WaitScratch::None => panic!("expected event-group scratch"),
        }
        k.check_invariants();

        k.resume_task(t1).unwrap();
        assert_eq!(k.task_state(t1).unwrap(), TaskState::RUNNABLE);
        k.check_invariants();
    }

    #[test]
    fn set_then_clear_restores_preimage() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x05).unwrap();
        k.modify_event_group(eg, ModifyOp::Set, 0x02).unwrap();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x07);
        k.modify_event_group(eg, ModifyOp::Clear, 0x02).unwrap();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x05);
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x0A).unwrap();
        k.modify_event_group(eg, ModifyOp::Toggle, 0x0F).unwrap();
        k.modify_event_group(eg, ModifyOp::Toggle, 0x0F).unwrap();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x0A);
    }

    #[test]
    fn wait_polling_succeeds_without_parking() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x02).unwrap();
        let t0 = tid(&k, 0);
        assert_eq!(k.wait_event_group_polling(eg, 0x06, WaitMode::Or), Ok(0x02));
        assert_eq!(k.task_state(t0).unwrap(), TaskState::RUNNABLE);
    }

    #[test]
    fn wait_polling_fails_immediately_without_parking() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        assert_eq!(
            k.wait_event_group_polling(eg, 0x01, WaitMode::Or),
            Err(WaitEventGroupPollingError::Timeout)
        );
    }

    #[test]
    fn wait_polling_rejects_empty_pattern() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        assert_eq!(
            k.wait_event_group_polling(eg, 0, WaitMode::Or),
            Err(WaitEventGroupPollingError::BadParam)
        );
    }

    #[test]
    fn wait_event_group_rejects_call_from_isr_context() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        let t0 = tid(&k, 0);
        k.enter_isr();
        assert_eq!(
            k.wait_event_group(t0, eg, 0x01, WaitMode::Or),
            Err(WaitEventGroupError::BadContext)
        );
        k.leave_isr();
    }

    #[test]
    fn imodify_is_deferred_until_isr_exit() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        let t0 = tid(&k, 0);
        let _ = k.wait_event_group_timeout(t0, eg, 0x01, WaitMode::Or, TICKS_INFINITE);

        k.enter_isr();
        k.imodify_event_group(eg, ModifyOp::Set, 0x01).unwrap();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x00, "imodify must not apply mid-ISR");
        assert_eq!(k.task_state(t0).unwrap(), TaskState::WAIT);
        k.leave_isr();

        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x01);
        assert_eq!(k.task_state(t0).unwrap(), TaskState::RUNNABLE);
    }

    #[test]
    fn iwait_polling_matches_task_context_polling_contract() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x04).unwrap();
        k.enter_isr();
        assert_eq!(k.iwait_event_group_polling(eg, 0x04, WaitMode::And), Ok(0x04));
        k.leave_isr();
    }

    #[test]
    fn create_event_group_from_isr_context_is_bad_context() {
        let mut k = kernel([5, 6]);
        k.enter_isr();
        assert_eq!(k.create_event_group(0x00), Err(CreateEventGroupError::BadContext));
        k.leave_isr();
    }

    #[test]
    fn delete_event_group_from_isr_context_is_bad_context() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        k.enter_isr();
        assert_eq!(k.delete_event_group(eg), Err(DeleteEventGroupError::BadContext));
        k.leave_isr();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x00, "delete_event_group must not have run");
    }

    #[test]
    fn modify_event_group_from_isr_context_is_bad_context() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        k.enter_isr();
        assert_eq!(
            k.modify_event_group(eg, ModifyOp::Set, 0x01),
            Err(ModifyEventGroupError::BadContext)
        );
        k.leave_isr();
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x00, "modify_event_group must not have run");
    }

    #[test]
    fn imodify_event_group_from_task_context_is_illegal_use() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x00).unwrap();
        assert_eq!(
            k.imodify_event_group(eg, ModifyOp::Set, 0x01),
            Err(ModifyEventGroupError::IllegalUse)
        );
        assert_eq!(k.event_group_pattern(eg).unwrap(), 0x00, "imodify_event_group must not have run");
    }

    #[test]
    fn wait_event_group_polling_from_isr_context_is_bad_context() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x02).unwrap();
        k.enter_isr();
        assert_eq!(
            k.wait_event_group_polling(eg, 0x02, WaitMode::Or),
            Err(WaitEventGroupPollingError::BadContext)
        );
        k.leave_isr();
    }

    #[test]
    fn iwait_event_group_polling_from_task_context_is_illegal_use() {
        let mut k = kernel([5, 6]);
        let eg = k.create_event_group(0x02).unwrap();
        assert_eq!(
            k.iwait_event_group_polling(eg, 0x02, WaitMode::Or),
            Err(WaitEventGroupPollingError::IllegalUse)
        );
    }
}
