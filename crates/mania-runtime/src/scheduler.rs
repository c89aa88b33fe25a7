use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::process::{Process, Status};

/// How long an idle Scheduler sleeps between empty turns. The Python
/// original's threads cooperate under the GIL and so can busy-loop on
/// `Scheduler.run`'s `while self.stopping.acquire(False)` pattern without
/// pegging a core; real OS threads here would spin at 100% CPU on an
/// empty process list without this, so a short sleep is added. This is
/// an ambient engineering necessity, not a behavior change — see
/// DESIGN.md.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// One OS thread hosting a pool of cooperative Processes, round-robined
/// by ascending priority. Grounded on `mania/node.py`'s `Scheduler`.
pub struct Scheduler {
    tick_limit: u32,
    processes: Mutex<Vec<Arc<Process>>>,
    new_processes: Mutex<Vec<Arc<Process>>>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(tick_limit: u32) -> Arc<Scheduler> {
        Arc::new(Scheduler {
            tick_limit,
            processes: Mutex::new(Vec::new()),
            new_processes: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        })
    }

    /// Registers `process` to be picked up on this Scheduler's next turn.
    pub fn spawn_process(&self, process: Arc<Process>) {
        self.new_processes.lock().unwrap().push(process);
    }

    /// How many processes (live + freshly queued) this Scheduler carries
    /// — used by `Node::spawn_process` to pick the least-loaded one.
    pub fn load(&self) -> usize {
        self.processes.lock().unwrap().len() + self.new_processes.lock().unwrap().len()
    }

    /// True while this Scheduler still has work (or could receive more):
    /// used by `Node::run` to decide when every Scheduler has drained.
    pub fn is_busy(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.load() > 0
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Spawns the OS thread that drives this Scheduler's turns.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        std::thread::spawn(move || scheduler.run_loop())
    }

    fn run_loop(&self) {
        while self.running.load(Ordering::SeqCst) {
            self.turn();
            if self.processes.lock().unwrap().is_empty() && self.new_processes.lock().unwrap().is_empty() {
                std::thread::sleep(IDLE_SLEEP);
            }
        }
    }

    /// One scheduling round: merge newly spawned processes in, tick each
    /// `Running` process, promote waiting processes whose condition is
    /// now satisfied, drop `Exiting` ones, then re-sort by priority so
    /// processes that have used fewer ticks run sooner (§4.7).
    fn turn(&self) {
        {
            let mut fresh = self.new_processes.lock().unwrap();
            if !fresh.is_empty() {
                self.processes.lock().unwrap().extend(fresh.drain(..));
            }
        }

        let snapshot: Vec<Arc<Process>> = self.processes.lock().unwrap().clone();
        for process in &snapshot {
            process.reconsider();
            if process.status() == Status::Running {
                if let Err(e) = process.run(self.tick_limit) {
                    tracing::error!(pid = process.id(), error = %e, "process raised an error; exiting");
                    process.kill();
                }
            }
        }

        let mut processes = self.processes.lock().unwrap();
        processes.retain(|p| p.status() != Status::Exiting);
        processes.sort_by(|a, b| a.priority().partial_cmp(&b.priority()).unwrap_or(std::cmp::Ordering::Equal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_core::{Builder, Code, Instruction, Scope, Symbol};

    fn exiting_process(id: u64) -> Arc<Process> {
        let mut builder = Builder::new(Symbol::new("m"));
        builder.emit(Instruction::Exit);
        let module = builder.finish(0);
        Process::new(id, std::sync::Weak::new(), Code::whole_module(module), Scope::root())
    }

    #[test]
    fn a_turn_runs_and_then_drops_an_exited_process() {
        let scheduler = Scheduler::new(1000);
        scheduler.spawn_process(exiting_process(1));
        scheduler.turn();
        scheduler.turn();
        assert_eq!(scheduler.processes.lock().unwrap().len(), 0);
    }

    #[test]
    fn load_counts_both_live_and_freshly_queued_processes() {
        let scheduler = Scheduler::new(1000);
        assert_eq!(scheduler.load(), 0);
        scheduler.spawn_process(exiting_process(1));
        assert_eq!(scheduler.load(), 1);
    }
}
