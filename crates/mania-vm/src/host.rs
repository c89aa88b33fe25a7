use std::sync::Arc;

use mania_core::{Scope, Symbol, Value};

/// What asking the host for a module comes back with. Mirrors
/// `mania/node.py`'s `Node.load_module`: a module can be fully compiled
/// and registered already, merely *registered* (its `.bam` path known
/// but not yet loaded into this Node, requiring a deferred compiler
/// spawn), or entirely unknown.
pub enum ModuleLookup {
    /// Already loaded: the finished, `BuildModule`-populated module.
    Ready(Arc<mania_core::ModuleData>),
    /// Known by name but not yet loaded — `LoadModule` should suspend
    /// this process (`Step::NeedsModule`) so the Scheduler can load it
    /// on this process's behalf before resuming.
    Deferred,
    Unknown,
}

/// The upward-facing seam between a single VM tick loop and the
/// Node/Process/Scheduler state that owns module registration,
/// inter-process messaging, and spawning (§4.7, §5).
///
/// `mania-vm` cannot depend on `mania-runtime` (the dependency runs the
/// other way: a Node builds VMs, not the reverse), so this trait is the
/// dependency-inversion seam — `mania-runtime`'s `Process` implements
/// it and hands the VM an `Arc<dyn Host>` at construction. This has no
/// direct counterpart in `mania/node.py`, which doesn't separate the
/// concerns into crates at all; it is this workspace's own answer to a
/// problem the Python original never had to solve.
pub trait Host: Send + Sync {
    fn lookup_module(&self, name: &Symbol) -> ModuleLookup;

    /// Registers a freshly `BuildModule`-populated module under its own
    /// name so future `LoadModule`/`import` calls can find it.
    fn register_module(&self, module: Arc<mania_core::ModuleData>);

    /// Pops the next queued message for this process, if any.
    fn receive(&self) -> Option<Value>;

    /// Delivers `value` to process `pid`'s mailbox.
    fn send(&self, pid: u64, value: Value);

    /// Spawns a new process running `code` under `scope`, returning its
    /// pid.
    fn spawn(&self, code: mania_core::Code, scope: Arc<Scope>) -> u64;

    /// This process's own pid, for `(self)`-style lookups some builtins
    /// need; §4.7 doesn't name such a builtin explicitly but `Spawn`'s
    /// result and `kill` both operate in terms of pids.
    fn pid(&self) -> u64;
}
