use std::fmt;

use mania_compiler::CompileError;
use mania_core::{CoreError, Symbol};
use mania_pattern::PatternError;

/// Errors raised while ticking the VM (§7's "VM-time error" kind).
/// Unlike a compile-time error, a `VmError` only ever terminates the
/// process that raised it — `mania-runtime`'s `Process` catches it and
/// moves on, it never propagates to the Scheduler or other Processes.
#[derive(Debug)]
pub enum VmError {
    Core(CoreError),
    Compile(CompileError),
    Pattern(PatternError),
    /// `Load`/colon-path descent found nothing.
    Name(Symbol),
    /// An instruction was fetched whose opcode this VM has no dispatch
    /// for (§7's "unhandled instruction exception"). Shouldn't happen
    /// for any `Instruction` this crate's decoder can produce, but a
    /// malformed `.bam` can still decode bytes `mania-vm` doesn't expect.
    UnhandledInstruction(&'static str),
    /// `Throw` ran with no enclosing `SetupCatch` anywhere on the frame
    /// chain — an unhandled instruction-level exception (§7).
    Uncaught(mania_core::Value),
    /// The frame chain ran out of parents to restore to while a value
    /// was still expected (a malformed or hand-written module skipping
    /// the compiler's own invariants).
    FrameUnderflow,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Core(e) => write!(f, "{e}"),
            VmError::Compile(e) => write!(f, "{e}"),
            VmError::Pattern(e) => write!(f, "{e}"),
            VmError::Name(sym) => write!(f, "name error: unbound symbol `{sym}`"),
            VmError::UnhandledInstruction(name) => write!(f, "unhandled instruction: {name}"),
            VmError::Uncaught(v) => write!(f, "uncaught exception: {v}"),
            VmError::FrameUnderflow => write!(f, "frame chain exhausted while a value was expected"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<CoreError> for VmError {
    fn from(e: CoreError) -> Self {
        VmError::Core(e)
    }
}

impl From<CompileError> for VmError {
    fn from(e: CompileError) -> Self {
        VmError::Compile(e)
    }
}

impl From<PatternError> for VmError {
    fn from(e: PatternError) -> Self {
        VmError::Pattern(e)
    }
}
