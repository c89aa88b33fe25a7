use mania_core::Symbol;

/// What one `Vm::tick` (or a `Vm::run` batch) produced. Mirrors
/// `mania/vm.py`'s `VM.run` return values, but as a closed enum rather
/// than a handful of sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The process has more work; keep ticking.
    Continue,
    /// The root frame ran out (an explicit `Exit`, or the outermost
    /// frame's window ran out with nothing left to restore to).
    Exited,
    /// `Yield` ran: cooperative, the Scheduler should reschedule this
    /// process at normal priority.
    Yielded,
    /// `Block` ran: the process asked to be parked until something wakes
    /// it (distinct from `WaitingForMessage`, which the Scheduler itself
    /// knows how to satisfy).
    Blocked,
    /// `Receive` found an empty mailbox. The instruction has been
    /// rewound so the same `Receive` re-runs once a message arrives.
    WaitingForMessage,
    /// `LoadModule` named a module the Host knows about but hasn't
    /// loaded yet. Rewound the same way as `WaitingForMessage`.
    NeedsModule(Symbol),
}
