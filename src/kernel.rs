//! The kernel facade (component G, scheduler core) and its construction
//! (SPEC_FULL §10.3 configuration).
//!
//! Per spec §9's "Global kernel state" design note, the ready queue, timer
//! wheel, current-task pointer and critical-section counter are bundled
//! behind one handle instead of being process-wide singletons, "so tests
//! can instantiate an isolated scheduler" — exactly what `Kernel::new` does.

use crate::event_group::EventGroupSlot;
use crate::isr::{DeferredAction, IsrQueue};
use crate::klock::CpuLock;
use crate::port::Port;
use crate::task::readyqueue::ReadyQueue;
use crate::task::{TaskDef, TaskId, TaskSlot, TaskState};
use crate::timer::TimerWheel;
use crate::util::list::ListLink;
use crate::wait::WaitResult;

/// Whether the kernel is currently executing on behalf of a task, or inside
/// an interrupt handler. Gates which primitive flavor (plain vs `i`-prefixed)
/// is legal, and whether a context switch can happen immediately or must be
/// deferred to `leave_isr` (spec §4.G, §6, §7's WCONTEXT bucket).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecContext {
    Task,
    Isr,
}

impl Default for ExecContext {
    fn default() -> Self {
        ExecContext::Task
    }
}

/// The kernel: a fixed-capacity scheduler over `NT` tasks, `NP` priority
/// levels and `NE` event groups, driven by a platform-supplied [`Port`].
///
/// No field is dynamically sized and no field is reallocated after
/// construction — the whole point of the const-generic arena (spec §1's
/// "no dynamic memory allocation inside the kernel").
pub struct Kernel<const NT: usize, const NP: usize, const NE: usize, P: Port> {
    pub(crate) tasks: [TaskSlot; NT],
    pub(crate) ready: ReadyQueue<NP>,
    pub(crate) timer: TimerWheel,
    pub(crate) event_groups: [EventGroupSlot; NE],
    pub(crate) isr: IsrQueue,
    pub(crate) cpu_lock: CpuLock,
    pub(crate) port: P,
    pub(crate) current: Option<TaskId>,
    pub(crate) context: ExecContext,
}

impl<const NT: usize, const NP: usize, const NE: usize, P: Port> Kernel<NT, NP, NE, P> {
    /// Builds the fixed task set from `defs` and performs the initial
    /// schedule. Every task's stack image is synthesized up front via
    /// `Port::init_stack`, matching the source's "create" step; tasks with
    /// `start_on_create` begin RUNNABLE (`TN_TASK_CREATE_OPT_START`), the
    /// rest DORMANT.
    pub fn new(mut port: P, defs: [TaskDef; NT]) -> Self {
        assert!(NP > 0, "a kernel needs at least one priority level");
        let mut tasks: [TaskSlot; NT] = core::array::from_fn(|i| {
            let def = &defs[i];
            let sp = port.init_stack(def.stack_base, def.stack_size, def.entry, def.param);
            let mut slot = TaskSlot::new_dormant(def, 1);
            slot.sp = sp;
            if def.start_on_create {
                slot.state = TaskState::RUNNABLE;
            }
            slot
        });

        let mut ready = ReadyQueue::new();
        for i in 0..NT {
            if tasks[i].state == TaskState::RUNNABLE {
                let priority = tasks[i].priority;
                ready.push_tail(&mut tasks, priority, i);
            }
        }

        let mut kernel = Self {
            tasks,
            ready,
            timer: TimerWheel::new(),
            event_groups: [EventGroupSlot::empty(); NE],
            isr: IsrQueue::new(),
            cpu_lock: CpuLock::new(),
            port,
            current: None,
            context: ExecContext::Task,
        };
        kernel.reschedule();
        kernel
    }

    fn task_id_from_index(&self, index: usize) -> TaskId {
        TaskId {
            index: index as u16,
            generation: self.tasks[index].generation,
        }
    }

    /// The task the scheduler currently considers "running" (spec §3
    /// invariant 4). `None` only when no task is RUNNABLE at all (every
    /// task dormant, suspended or waiting) — real deployments avoid this by
    /// always keeping one lowest-priority task runnable.
    pub fn current_task(&self) -> Option<TaskId> {
        self.current
    }

    /// Opens a critical section (component B), delegating the actual
    /// interrupt mask to the port.
    pub fn enter_critical(&mut self) {
        self.cpu_lock.enter(&mut self.port);
    }

    /// Closes a critical section; the outermost close re-enables interrupts
    /// and lets a pending reschedule run.
    pub fn leave_critical(&mut self) {
        let was_outermost = self.cpu_lock.leave(&mut self.port);
        if was_outermost {
            self.reschedule();
        }
    }

    /// Enters interrupt context. Call before invoking any `i`-prefixed
    /// entry point from the platform's interrupt trampoline.
    pub fn enter_isr(&mut self) {
        self.context = ExecContext::Isr;
        self.cpu_lock.enter(&mut self.port);
    }

    /// Leaves interrupt context: drains the deferred-action ring under the
    /// still-held critical section, then releases it and lets the
    /// scheduler request a context switch if one is due (spec §4.I, §4.G:
    /// "In ISR context, [the switch] is deferred to ISR exit").
    pub fn leave_isr(&mut self) {
        self.context = ExecContext::Task;
        for action in self.isr.drain() {
            self.perform_deferred(action);
        }
        self.cpu_lock.leave(&mut self.port);
        self.reschedule();
    }

    fn perform_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::ActivateTask(id) => {
                let _ = self.activate_task_inner(id);
            }
            DeferredAction::WakeupTask(id) => {
                let _ = self.wakeup_task(id);
            }
            DeferredAction::ReleaseWait(id) => {
                let _ = self.release_wait(id);
            }
            DeferredAction::ModifyEventGroup(id, op, pattern) => {
                let _ = self.modify_event_group(id, op, pattern);
            }
        }
    }

    /// Advances the timer wheel by one tick (spec §4.D, called from the
    /// platform's `tick_isr`). Every expired task is released with
    /// `Timeout`; if the `round_robin` feature is enabled, the running
    /// task's time slice is also decremented and it is rotated to the tail
    /// of its priority list when the slice is exhausted (spec §4.C).
    pub fn tick(&mut self) {
        self.enter_isr();

        let mut expired: arrayvec::ArrayVec<usize, NT> = arrayvec::ArrayVec::new();
        self.timer.tick(&mut self.tasks, |_, index| {
            let _ = expired.push(index);
        });
        for index in expired {
            self.release(index, WaitResult::Timeout);
        }

        #[cfg(feature = "round_robin")]
        self.round_robin_tick();

        self.leave_isr();
    }

    #[cfg(feature = "round_robin")]
    fn round_robin_tick(&mut self) {
        let Some(current) = self.current else { return };
        let index = current.index();
        if !self.tasks[index].state.contains(TaskState::RUNNABLE) {
            return;
        }
        if self.tasks[index].slice_ticks > 0 {
            self.tasks[index].slice_ticks -= 1;
        }
        if self.tasks[index].slice_ticks == 0 {
            let priority = self.tasks[index].priority;
            self.ready.rotate(&mut self.tasks, priority);
            self.tasks[index].slice_ticks = crate::task::DEFAULT_TIME_SLICE;
        }
    }

    /// Scheduler core (spec §4.G): picks the head of the highest non-empty
    /// ready priority and, if it differs from `current` and preemption is
    /// allowed (nesting == 0, task context), asks the port to switch.
    pub(crate) fn reschedule(&mut self) {
        if self.cpu_lock.is_locked() {
            return;
        }
        if self.context == ExecContext::Isr {
            return;
        }
        let next_index = self
            .ready
            .highest_priority()
            .and_then(|p| self.ready.head_of(p));
        let next = next_index.map(|i| self.task_id_from_index(i));
        if next != self.current {
            #[cfg(test)]
            log::debug!("reschedule: {:?} -> {:?}", self.current, next);
            if let Some(to) = next {
                self.port.context_switch(self.current, to);
            }
            self.current = next;
        }
    }

    #[cfg(any(test, debug_assertions))]
    fn link_of(slot: &TaskSlot, which: LinkKind) -> ListLink {
        match which {
            LinkKind::Wait => slot.wait_link,
            LinkKind::Timer => slot.timer_link,
        }
    }

    #[cfg(any(test, debug_assertions))]
    fn list_contains(&self, mut cur: Option<usize>, which: LinkKind, index: usize) -> bool {
        while let Some(i) = cur {
            if i == index {
                return true;
            }
            cur = Self::link_of(&self.tasks[i], which).next();
        }
        false
    }

    /// Verifies the five quantified invariants from spec §8. Meant for
    /// tests and debug assertions, not for every primitive call in a
    /// release build.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) {
        // 1. ready-queue bitmap bit p set iff the list at p is non-empty.
        for p in 0..NP {
            assert_eq!(
                self.ready.bitmap_bit(p),
                !self.ready.list_is_empty(p),
                "ready bitmap bit {p} disagrees with list emptiness"
            );
        }

        for (index, task) in self.tasks.iter().enumerate() {
            if task.deleted {
                continue;
            }
            let waiting = task.state.contains(TaskState::WAIT);
            let runnable = task.state == TaskState::RUNNABLE;

            // 2. on the timer wheel iff ticks_remaining is finite and WAIT.
            let on_timer = self.list_contains(self.timer.front(), LinkKind::Timer, index);
            let should_be_on_timer = waiting && task.ticks_remaining < crate::TICKS_INFINITE;
            assert_eq!(
                on_timer, should_be_on_timer,
                "task {index} timer-wheel membership disagrees with (WAIT && finite timeout)"
            );

            // 3 & 5. a waiting task is linked in exactly the one wait queue
            // its back-pointer names, and in no other event group's queue.
            let mut wait_queue_hits = 0;
            for eg in self.event_groups.iter() {
                if !eg.alive {
                    continue;
                }
                if self.list_contains(eg.wait_queue.front(), LinkKind::Wait, index) {
                    wait_queue_hits += 1;
                }
            }
            if waiting {
                assert!(
                    task.parked_on.is_some() || task.wait_link == ListLink::UNLINKED,
                    "task {index} is WAIT but parked on no object and not a sleeper"
                );
                assert!(
                    wait_queue_hits <= 1,
                    "task {index} appears on more than one wait queue"
                );
            } else {
                assert_eq!(
                    wait_queue_hits, 0,
                    "task {index} is not WAIT but is linked on a wait queue"
                );
            }

            // 4 (partial, the rest is checked by `runnable` loop membership
            // below): a RUNNABLE task must be on the ready queue.
            if runnable {
                let on_ready = self.list_contains_ready(task.priority, index);
                assert!(on_ready, "task {index} is RUNNABLE but absent from its ready list");
            }
        }

        // 4. the running task is an element of the ready list at
        // highest_priority().
        if let Some(current) = self.current {
            let hp = self.ready.highest_priority();
            assert_eq!(
                hp,
                Some(self.tasks[current.index()].priority),
                "current task's priority is not the ready queue's highest"
            );
        }
    }

    #[cfg(any(test, debug_assertions))]
    fn list_contains_ready(&self, priority: usize, index: usize) -> bool {
        let mut cur = self.ready.head_of(priority);
        while let Some(i) = cur {
            if i == index {
                return true;
            }
            cur = self.tasks[i].ready_link.next();
        }
        false
    }
}

#[cfg(any(test, debug_assertions))]
#[derive(Clone, Copy)]
enum LinkKind {
    Wait,
    Timer,
}
