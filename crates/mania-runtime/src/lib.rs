//! Mania Runtime: the Process/Scheduler/Node cooperative scheduling
//! layer (§4.7, §5, §6.3), the `.bam` boot-path walk, and the default
//! native modules (`mania:boot`, `mania:io`, arithmetic/comparison/list
//! natives) a Node needs before it can run anything.
//!
//! `mania-vm` never depends on this crate; this crate's `Process`
//! implements `mania_vm::Host` and owns the tick-budget loop that calls
//! into `Vm::run`.

pub mod bam_loader;
pub mod builtins;
pub mod error;
pub mod node;
pub mod process;
pub mod scheduler;

pub use error::RuntimeError;
pub use node::{Node, NodeConfig};
pub use process::{Process, Status};
pub use scheduler::Scheduler;
