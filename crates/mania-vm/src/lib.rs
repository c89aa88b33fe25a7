//! Mania VM: the fetch-decode-execute loop over `mania-core` bytecode,
//! the call/frame model, and the `Host` seam a runtime uses to supply
//! module lookup, messaging, and spawning (§4.3, §4.5, §4.6).
//!
//! This crate never runs anything on its own — `mania-runtime`'s
//! `Process` owns the `Host` implementation and the tick-budget loop
//! that calls into `Vm::run`.

pub mod colon_path;
pub mod error;
pub mod frame;
pub mod host;
pub mod step;
pub mod vm;

pub use error::VmError;
pub use frame::Frame;
pub use host::{Host, ModuleLookup};
pub use step::Step;
pub use vm::Vm;
