//! External interfaces (spec §6): the seam between this crate's pure
//! scheduling logic and a concrete target. None of these are implemented
//! here — the crate is the core, not a port.

/// Hooks the platform must provide. The kernel core calls these; it never
/// assumes a concrete architecture.
pub trait Port {
    /// Globally disables interrupts and returns an opaque token describing
    /// the previous state, to be passed back to [`Port::restore_interrupts`].
    /// Used by the critical-section guard (component B).
    fn disable_interrupts(&mut self) -> InterruptState;

    /// Restores the interrupt-enable state captured by a matching
    /// `disable_interrupts` call.
    fn restore_interrupts(&mut self, saved: InterruptState);

    /// Saves `from`'s context and restores `to`'s, making `to` the running
    /// task. In an ISR the actual switch is expected to be deferred until
    /// the outermost interrupt handler returns; `Kernel` calls this only
    /// when it has determined a switch is both necessary and immediately
    /// performable.
    fn context_switch(&mut self, from: Option<crate::task::TaskId>, to: crate::task::TaskId);

    /// Synthesizes a stack image for a not-yet-started task such that the
    /// first `context_switch` into it resumes at `entry(param)`. Returns an
    /// opaque handle the port can later use to locate the task's saved
    /// stack pointer; this crate never dereferences it.
    fn init_stack(&mut self, stack_base: usize, stack_size: usize, entry: usize, param: usize) -> usize;
}

/// Opaque interrupt-enable snapshot returned by [`Port::disable_interrupts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptState(pub usize);

/// A [`Port`] that does nothing beyond bookkeeping, for use in tests that
/// only need the scheduler's data-structure invariants, not a real context
/// switch. Mirrors the role the teacher's simulator ports play in its own
/// test suite.
#[derive(Debug, Default)]
pub struct NullPort {
    pub interrupts_disabled: bool,
    pub switch_log: alloc_free_vec::Log,
}

impl Port for NullPort {
    fn disable_interrupts(&mut self) -> InterruptState {
        let was_enabled = !self.interrupts_disabled;
        self.interrupts_disabled = true;
        InterruptState(was_enabled as usize)
    }

    fn restore_interrupts(&mut self, saved: InterruptState) {
        self.interrupts_disabled = saved.0 == 0;
    }

    fn context_switch(&mut self, from: Option<crate::task::TaskId>, to: crate::task::TaskId) {
        self.switch_log.push((from, to));
    }

    fn init_stack(&mut self, _stack_base: usize, _stack_size: usize, _entry: usize, _param: usize) -> usize {
        0
    }
}

/// A tiny `no_std`-friendly fixed log, so [`NullPort`] does not need `alloc`.
mod alloc_free_vec {
    use crate::task::TaskId;
    use arrayvec::ArrayVec;

    #[derive(Debug, Default)]
    pub struct Log(ArrayVec<(Option<TaskId>, TaskId), 64>);

    impl Log {
        pub fn push(&mut self, entry: (Option<TaskId>, TaskId)) {
            // Test double only; drop the oldest entry rather than panic if a
            // test somehow runs more than 64 switches without inspecting the log.
            if self.0.is_full() {
                self.0.remove(0);
            }
            self.0.push(entry);
        }

        pub fn last(&self) -> Option<(Option<TaskId>, TaskId)> {
            self.0.last().copied()
        }

        pub fn as_slice(&self) -> &[(Option<TaskId>, TaskId)] {
            &self.0
        }
    }
}
