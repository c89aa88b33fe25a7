//! Mania Core: the value model, bytecode instruction set, and binary
//! module codec shared by every other crate in this workspace.
//!
//! Nothing in this crate executes code; `mania-vm` owns the fetch-decode-
//! execute loop. This crate is the closed set of things that loop
//! operates over: `Value`, `Scope`, `Instruction`, and the `.bam` codec.

pub mod arithmetic;
pub mod bindings;
pub mod error;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod scope;
pub mod symbol;
pub mod value;

pub use bindings::{Binding, Bindings};
pub use error::CoreError;
pub use instruction::Instruction;
pub use module::{Builder, Code, ModuleData};
pub use opcode::Opcode;
pub use scope::Scope;
pub use symbol::Symbol;
pub use value::{CompileFn, FunctionData, NativeFunctionData, NativeRule, PairIter, Rule, StreamHandle, Value};
