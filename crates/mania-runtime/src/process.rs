use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use mania_core::{Code, Scope, Symbol, Value};
use mania_vm::{Frame, Host, ModuleLookup, Step, Vm};

use crate::error::RuntimeError;
use crate::node::Node;

/// Mirrors `mania/node.py`'s `Process` status enum (§4.7). There is no
/// status for a `Block`-ed process beyond `Blocked` itself: §4.7 names
/// only these four states plus the fact that `Block` parks a process
/// "until something wakes it", and names no host-level wake API — so a
/// blocked process simply stays parked (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Exiting,
    WaitingForMessage,
    WaitingForModule,
    Blocked,
}

/// A single cooperative process: one VM, one mailbox, one priority
/// counter. Grounded on `mania/node.py`'s `Process`.
pub struct Process {
    id: u64,
    node: Weak<Node>,
    vm: Mutex<Vm>,
    mailbox: Mutex<VecDeque<Value>>,
    status: Mutex<Status>,
    /// Module this process is parked on while `WaitingForModule`.
    waiting_for: Mutex<Option<Symbol>>,
    /// Accumulated `ticks_consumed / tick_limit`; lower runs sooner.
    priority: Mutex<f64>,
    kill_requested: AtomicBool,
}

impl Process {
    /// Builds a process running `code` under `scope`, with `node` as the
    /// Host it delegates module lookup/messaging/spawning to.
    ///
    /// The VM's `Host` needs an `Arc<dyn Host>` that ultimately reaches
    /// back into this same `Process` (for its own mailbox) and into
    /// `Node` (for module lookup/spawning) — a classic self-reference.
    /// `Arc::new_cyclic` breaks the cycle: the `Host` implementation
    /// (`ProcessHost`) only ever holds a `Weak<Process>`, so there is no
    /// strong reference loop for this `Arc<Process>` to leak through.
    pub fn new(id: u64, node: Weak<Node>, code: Code, scope: Arc<Scope>) -> Arc<Process> {
        Arc::new_cyclic(|weak_self| {
            let host: Arc<dyn Host> = Arc::new(ProcessHost(weak_self.clone()));
            let frame = Frame::new(code, scope, None);
            Process {
                id,
                node,
                vm: Mutex::new(Vm::new(frame, host)),
                mailbox: Mutex::new(VecDeque::new()),
                status: Mutex::new(Status::Running),
                waiting_for: Mutex::new(None),
                priority: Mutex::new(0.0),
                kill_requested: AtomicBool::new(false),
            }
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> Status {
        *self.status.lock().unwrap()
    }

    pub fn priority(&self) -> f64 {
        *self.priority.lock().unwrap()
    }

    pub fn waiting_for(&self) -> Option<Symbol> {
        self.waiting_for.lock().unwrap().clone()
    }

    /// Delivers a message to this process's mailbox and, if it was
    /// parked on an empty one, marks it ready to resume.
    pub fn deliver(&self, value: Value) {
        self.mailbox.lock().unwrap().push_back(value);
    }

    fn has_mail(&self) -> bool {
        !self.mailbox.lock().unwrap().is_empty()
    }

    fn pop_mail(&self) -> Option<Value> {
        self.mailbox.lock().unwrap().pop_front()
    }

    /// Sets `EXITING` at the next safe point (§5): tries the status
    /// lock non-blocking, so an idle process is killed immediately.
    /// When `run` is mid-call on another thread it holds that lock for
    /// the duration, so the `try_lock` fails here and `kill_requested`
    /// is left for `run` to consume when it finishes — never mid-tick.
    pub fn kill(&self) {
        self.kill_requested.store(true, Ordering::SeqCst);
        if let Ok(mut status) = self.status.try_lock() {
            *status = Status::Exiting;
        }
    }

    /// Called by the Scheduler once per turn. Promotes a parked status
    /// back to `Running` when its wait condition is satisfied.
    pub fn reconsider(&self) {
        let mut status = self.status.lock().unwrap();
        match *status {
            Status::WaitingForMessage if self.has_mail() => *status = Status::Running,
            Status::WaitingForModule => {
                let waiting_for = self.waiting_for.lock().unwrap().clone();
                if let Some(name) = waiting_for {
                    if let Some(node) = self.node.upgrade() {
                        if node.has_loaded(&name) {
                            *status = Status::Running;
                            *self.waiting_for.lock().unwrap() = None;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Runs the VM for up to `ticks` instructions, per §4.6/§4.7.
    /// Updates `status`/`priority`/`waiting_for` from the result, then
    /// promotes a pending kill to `EXITING` — a kill requested while
    /// this call was running still takes effect only now, at the next
    /// safe point, never mid-instruction.
    pub fn run(&self, ticks: u32) -> Result<u32, RuntimeError> {
        let mut status = self.status.lock().unwrap();
        if *status != Status::Running {
            return Ok(0);
        }

        let (step, consumed) = {
            let mut vm = self.vm.lock().unwrap();
            vm.run(ticks)?
        };

        *self.priority.lock().unwrap() += consumed as f64 / ticks.max(1) as f64;

        *status = match step {
            Step::Continue | Step::Yielded => Status::Running,
            Step::Exited => Status::Exiting,
            Step::Blocked => Status::Blocked,
            Step::WaitingForMessage => Status::WaitingForMessage,
            Step::NeedsModule(name) => {
                *self.waiting_for.lock().unwrap() = Some(name);
                Status::WaitingForModule
            }
        };

        if self.kill_requested.load(Ordering::SeqCst) {
            *status = Status::Exiting;
        }

        Ok(consumed)
    }
}

/// The `mania-vm::Host` seam, holding only a `Weak<Process>` back-
/// reference so `Process`'s own `Mutex<Vm>` does not own a strong cycle
/// back to itself. See `Process::new`'s doc comment.
struct ProcessHost(Weak<Process>);

impl ProcessHost {
    fn process(&self) -> Arc<Process> {
        self.0.upgrade().expect("Host outlived its owning Process")
    }

    fn node(&self) -> Arc<Node> {
        self.process()
            .node
            .upgrade()
            .expect("Host outlived its owning Node")
    }
}

impl Host for ProcessHost {
    fn lookup_module(&self, name: &Symbol) -> ModuleLookup {
        self.node().lookup_module(name)
    }

    fn register_module(&self, module: Arc<mania_core::ModuleData>) {
        self.node().register_loaded_module(module);
    }

    fn receive(&self) -> Option<Value> {
        self.process().pop_mail()
    }

    fn send(&self, pid: u64, value: Value) {
        self.node().send(pid, value);
    }

    fn spawn(&self, code: Code, scope: Arc<Scope>) -> u64 {
        self.node().spawn_process(code, scope)
    }

    fn pid(&self) -> u64 {
        self.process().id()
    }
}
