use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use mania_core::{Code, ModuleData, Scope, Symbol, Value};
use mania_vm::ModuleLookup;

use crate::bam_loader;
use crate::error::RuntimeError;
use crate::process::Process;
use crate::scheduler::Scheduler;

/// How often `Node::run` polls Scheduler liveness while waiting for a
/// boot to drain. Grounded on `mania/node.py`'s `scheduler.join(0.1)`.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Construction-time configuration, per SPEC_FULL.md §2's note that
/// `Node::new` takes an explicit config struct rather than a file-based
/// format — there is no persistence format beyond `.bam` itself.
pub struct NodeConfig {
    pub tick_limit: u32,
    pub scheduler_count: usize,
    pub boot_paths: Vec<PathBuf>,
}

/// The top-level runtime: a pool of Schedulers, the module registry, and
/// the pid counter. Grounded on `mania/node.py`'s `Node`.
///
/// `registered_modules`/`loaded_modules`'s two-table split in the Python
/// original exists to support `mania:boot`'s *deferred* `define-module`,
/// which declares a module's name+exports without compiling its body.
/// This workspace's `define-module` (see `builtins::boot`) is a single
/// synchronous NativeMacro instead, so there is never a "registered but
/// uncompiled" module to track — the analogous distinction this Node
/// still needs is between a `.bam` module whose process hasn't reached
/// `BuildModule` yet (`pending`, populated up front by `init_modules`
/// decoding every boot-path file's name before spawning any of them) and
/// one that genuinely doesn't exist (`Unknown`). See DESIGN.md.
pub struct Node {
    schedulers: Vec<Arc<Scheduler>>,
    loaded_modules: Mutex<HashMap<Symbol, Arc<ModuleData>>>,
    pending: Mutex<HashSet<Symbol>>,
    processes: Mutex<HashMap<u64, Arc<Process>>>,
    next_pid: AtomicU64,
    tick_limit: u32,
    boot_paths: Vec<PathBuf>,
    boot_scope: Arc<Scope>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Arc<Node> {
        let schedulers = (0..config.scheduler_count.max(1))
            .map(|_| Scheduler::new(config.tick_limit))
            .collect();
        Arc::new(Node {
            schedulers,
            loaded_modules: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
            processes: Mutex::new(HashMap::new()),
            next_pid: AtomicU64::new(1),
            tick_limit: config.tick_limit,
            boot_paths: config.boot_paths,
            boot_scope: crate::builtins::default_scope(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Starts every Scheduler's thread, walks the boot paths for `.bam`
    /// modules and spawns a process over each one's entry code (§6.3),
    /// then blocks until the whole boot has run to completion, stopping
    /// every Scheduler before returning.
    pub fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        {
            let mut handles = self.handles.lock().unwrap();
            for scheduler in &self.schedulers {
                handles.push(scheduler.start());
            }
        }

        self.init_modules()?;
        self.run();

        for scheduler in &self.schedulers {
            scheduler.stop();
        }
        for handle in self.handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }

    /// §6.3: recursively finds every `.bam` file under each boot path,
    /// decodes it (learning its name, without running it), records the
    /// name as `pending`, then spawns a process over each one's entry
    /// code in a scope parented at the boot scope. All names are
    /// recorded before any process is spawned, so a module importing a
    /// sibling boot module always sees `Deferred` rather than `Unknown`
    /// regardless of scheduling order.
    fn init_modules(self: &Arc<Self>) -> Result<(), RuntimeError> {
        let mut modules = Vec::new();
        for root in &self.boot_paths {
            for path in bam_loader::find_bam_files(root) {
                let bytes = std::fs::read(&path).map_err(|e| RuntimeError::Io(e.to_string()))?;
                let module = mania_core::module::load_module(&bytes).map_err(|source| RuntimeError::Bam {
                    path: path.display().to_string(),
                    source,
                })?;
                self.pending.lock().unwrap().insert(module.name.clone());
                modules.push(module);
            }
        }

        for module in modules {
            let scope = Scope::child(Arc::clone(&self.boot_scope));
            self.spawn_process(Code::whole_module(module), scope);
        }
        Ok(())
    }

    /// Blocks until every Scheduler has nothing left to run, polling
    /// rather than a condvar-based wakeup since a Scheduler's work
    /// supply (new processes arriving via `Send`-triggered wakeups) has
    /// no single signal to wait on across every thread at once.
    fn run(&self) {
        while self.schedulers.iter().any(|s| s.is_busy()) {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Picks the least-loaded Scheduler and hands it a new Process.
    pub fn spawn_process(self: &Arc<Self>, code: Code, scope: Arc<Scope>) -> u64 {
        let id = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let process = Process::new(id, Arc::downgrade(self), code, scope);
        self.processes.lock().unwrap().insert(id, Arc::clone(&process));

        let scheduler = self
            .schedulers
            .iter()
            .min_by_key(|s| s.load())
            .expect("at least one scheduler");
        scheduler.spawn_process(process);
        id
    }

    pub fn kill_process(&self, pid: u64) {
        if let Some(process) = self.processes.lock().unwrap().get(&pid) {
            process.kill();
        }
    }

    pub fn send(&self, pid: u64, value: Value) {
        if let Some(process) = self.processes.lock().unwrap().get(&pid) {
            process.deliver(value);
        }
    }

    pub fn lookup_module(&self, name: &Symbol) -> ModuleLookup {
        if let Some(module) = self.loaded_modules.lock().unwrap().get(name) {
            return ModuleLookup::Ready(Arc::clone(module));
        }
        if self.pending.lock().unwrap().contains(name) {
            return ModuleLookup::Deferred;
        }
        ModuleLookup::Unknown
    }

    pub fn register_loaded_module(&self, module: Arc<ModuleData>) {
        self.pending.lock().unwrap().remove(&module.name);
        self.loaded_modules.lock().unwrap().insert(module.name.clone(), module);
    }

    pub fn has_loaded(&self, name: &Symbol) -> bool {
        self.loaded_modules.lock().unwrap().contains_key(name)
    }

    pub fn boot_scope(&self) -> Arc<Scope> {
        Arc::clone(&self.boot_scope)
    }

    pub fn tick_limit(&self) -> u32 {
        self.tick_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_core::{Builder, Instruction};

    fn config(tmp: &std::path::Path) -> NodeConfig {
        NodeConfig {
            tick_limit: 100,
            scheduler_count: 1,
            boot_paths: vec![tmp.to_path_buf()],
        }
    }

    #[test]
    fn start_with_no_boot_paths_runs_to_completion_immediately() {
        let node = Node::new(NodeConfig {
            tick_limit: 100,
            scheduler_count: 1,
            boot_paths: vec![],
        });
        node.start().unwrap();
    }

    #[test]
    fn boot_path_bam_module_is_loaded_and_registered() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = Builder::new(Symbol::new("boot-test"));
        let exports_idx = builder.constant(Value::Nil);
        builder.emit(Instruction::LoadConstant(exports_idx));
        let name_idx = builder.constant(Value::Symbol(Symbol::new("boot-test")));
        builder.emit(Instruction::LoadConstant(name_idx));
        builder.emit(Instruction::BuildModule);
        builder.emit(Instruction::Exit);
        let module = builder.finish(0);
        let bytes = mania_core::module::dump_module(&module).unwrap();
        std::fs::write(dir.path().join("boot-test.bam"), bytes).unwrap();

        let node = Node::new(config(dir.path()));
        node.start().unwrap();
        assert!(node.has_loaded(&Symbol::new("boot-test")));
    }

    #[test]
    fn lookup_module_distinguishes_unknown_from_pending() {
        let node = Node::new(NodeConfig {
            tick_limit: 100,
            scheduler_count: 1,
            boot_paths: vec![],
        });
        assert!(matches!(node.lookup_module(&Symbol::new("nope")), ModuleLookup::Unknown));
    }
}
