//! Per-operation error types (spec §7, SPEC_FULL §10.2).
//!
//! The source returns one flat result code from every primitive. Rust
//! idiom, and the teacher's own `error.rs`, replace that with one small enum
//! per operation carrying only the outcomes that operation can actually
//! produce — a `wait` with no timeout cannot time out, so its error type has
//! no `Timeout` variant, unlike the `_timeout` flavor's.
//!
//! Each variant's doc comment names the §7 policy bucket it realizes.

use core::fmt;

/// Internal sentinel returned by handle lookups (`task_slot`, `event_group_slot`,
/// ...) before the caller maps it onto the specific operation's public error
/// type. Never exposed in a public signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BadId;

/// Internal sentinel for "this primitive is task-context-only", mapped at the
/// call site onto the specific operation's `BadContext` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BadContext;

/// Internal sentinel for "this primitive is ISR-context-only", mapped at the
/// call site onto the specific operation's `IllegalUse` variant (spec §6's
/// ILLEGAL_USE bucket: the reverse direction of WCONTEXT — an `i`-prefixed
/// entry point called from task context instead of from an ISR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IllegalUse;

macro_rules! op_error {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

op_error!(
    /// [`crate::kernel::Kernel::activate_task`] / `iactivate_task`.
    ActivateTaskError {
        /// WPARAM: no task with that id (stale generation or out of range).
        BadId,
        /// WCONTEXT: `activate_task` called from ISR context (use `iactivate_task`).
        BadContext,
        /// WSTATE: task was not DORMANT.
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::suspend_task`].
    SuspendTaskError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: task-context-only primitive called from an ISR.
        BadContext,
        /// WSTATE: task was DORMANT, or already carries the SUSPEND bit.
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::resume_task`].
    ResumeTaskError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: task-context-only primitive called from an ISR.
        BadContext,
        /// WSTATE: task did not carry the SUSPEND bit.
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::sleep`].
    SleepError {
        /// WCONTEXT: a task may only put itself to sleep; not callable from an
        /// ISR, and not callable on behalf of another task.
        BadContext,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::wakeup_task`] / `iwakeup_task`.
    WakeupTaskError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: `wakeup_task` is task-context-only; call `iwakeup_task` from an ISR.
        BadContext,
        /// ILLEGAL_USE: `iwakeup_task` called from task context; call `wakeup_task` instead.
        IllegalUse,
        /// WSTATE: task is not asleep (its wait reason is not `Sleep`).
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::release_wait`] / `irelease_wait`.
    ReleaseWaitError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: `release_wait` is task-context-only; call `irelease_wait` from an ISR.
        BadContext,
        /// ILLEGAL_USE: `irelease_wait` called from task context; call `release_wait` instead.
        IllegalUse,
        /// WSTATE: task does not carry the WAIT bit (spec §5: "Calling
        /// release_wait on a non-waiting task returns WSTATE").
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::exit_task`].
    ExitTaskError {
        /// WCONTEXT: a task may only exit itself; not callable from an ISR,
        /// and not callable on behalf of another task.
        BadContext,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::terminate_task`].
    TerminateTaskError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: task-context-only primitive called from an ISR.
        BadContext,
        /// WSTATE: task is already DORMANT.
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::delete_task`].
    DeleteTaskError {
        /// WPARAM: no task with that id.
        BadId,
        /// WCONTEXT: `delete_task` has no ISR-safe counterpart; calling it from
        /// an ISR is rejected outright.
        BadContext,
        /// WSTATE: task is not DORMANT.
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::change_priority`].
    ChangePriorityError {
        /// WPARAM: no task with that id, or the new priority is out of range.
        BadParam,
        /// WCONTEXT: `change_priority` has no ISR-safe counterpart; calling it
        /// from an ISR is rejected outright.
        BadContext,
        /// WSTATE: task is DORMANT (priority is only meaningful while schedulable).
        BadState,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::create_event_group`].
    ///
    /// Unlike the source (which creates over caller-supplied static storage
    /// and so cannot run out of slots), this crate's event groups live in a
    /// fixed-capacity arena; `SlotsExhausted` is the one failure mode that
    /// has no counterpart in spec §7's bucket list.
    CreateEventGroupError {
        SlotsExhausted,
        /// WCONTEXT: `create_event_group` has no ISR-safe counterpart; calling
        /// it from an ISR is rejected outright.
        BadContext,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::delete_event_group`].
    DeleteEventGroupError {
        /// WPARAM: no event group with that id.
        BadId,
        /// WCONTEXT: `delete_event_group` has no ISR-safe counterpart; calling
        /// it from an ISR is rejected outright.
        BadContext,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::wait_event_group`].
    WaitEventGroupError {
        /// WPARAM: no event group with that id, or an empty wait pattern.
        BadParam,
        /// WCONTEXT: blocking wait called from an ISR (use `iwait_polling`).
        BadContext,
        /// The event group was deleted while this call was parked.
        Deleted,
        /// The waiting task was released with `release_wait` before its
        /// condition was satisfied.
        Forced,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::wait_event_group_timeout`].
    WaitEventGroupTimeoutError {
        /// WPARAM: no event group with that id, or an empty wait pattern.
        BadParam,
        /// WCONTEXT: blocking wait called from an ISR.
        BadContext,
        /// The event group was deleted while this call was parked.
        Deleted,
        /// The waiting task was released with `release_wait` before its
        /// condition was satisfied.
        Forced,
        /// The timeout elapsed before the condition was satisfied.
        Timeout,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::wait_event_group_polling`] / `iwait_event_group_polling`.
    WaitEventGroupPollingError {
        /// WPARAM: no event group with that id, or an empty wait pattern.
        BadParam,
        /// WCONTEXT: `wait_event_group_polling` is task-context-only; call
        /// `iwait_event_group_polling` from an ISR.
        BadContext,
        /// ILLEGAL_USE: `iwait_event_group_polling` called from task context;
        /// call `wait_event_group_polling` instead.
        IllegalUse,
        /// The condition was not satisfied and polling never blocks.
        Timeout,
    }
);

op_error!(
    /// [`crate::kernel::Kernel::modify_event_group`] / `imodify_event_group`.
    ModifyEventGroupError {
        /// WPARAM: no event group with that id.
        BadId,
        /// WCONTEXT: `modify_event_group` is task-context-only; call
        /// `imodify_event_group` from an ISR.
        BadContext,
        /// ILLEGAL_USE: `imodify_event_group` called from task context; call
        /// `modify_event_group` instead.
        IllegalUse,
    }
);
