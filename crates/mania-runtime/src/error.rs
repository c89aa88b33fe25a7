use std::fmt;

use mania_core::{CoreError, Symbol};
use mania_vm::VmError;

/// Errors raised by the Process/Scheduler/Node layer itself, as opposed to
/// the VM-time errors a single process can raise and recover from by
/// exiting (`VmError`). Hand-rolled, matching every other crate in this
/// workspace (see `mania-core::error::CoreError`'s doc comment).
#[derive(Debug)]
pub enum RuntimeError {
    /// `load_module` found neither a loaded nor a registered module under
    /// this name (§4.7's "not-found import error").
    UnknownModule(Symbol),
    /// A `.bam` file on a boot path failed to decode.
    Bam { path: String, source: CoreError },
    /// An I/O failure reading or writing through a `mania:io` Stream.
    Io(String),
    Vm(VmError),
    Core(CoreError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownModule(name) => write!(f, "no module named `{name}`"),
            RuntimeError::Bam { path, source } => write!(f, "failed to load `{path}`: {source}"),
            RuntimeError::Io(msg) => write!(f, "io error: {msg}"),
            RuntimeError::Vm(e) => write!(f, "{e}"),
            RuntimeError::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<VmError> for RuntimeError {
    fn from(e: VmError) -> Self {
        RuntimeError::Vm(e)
    }
}

impl From<CoreError> for RuntimeError {
    fn from(e: CoreError) -> Self {
        RuntimeError::Core(e)
    }
}
