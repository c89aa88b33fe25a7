use std::sync::Arc;

use mania_core::{Code, Scope, Value};

/// One activation: a code window, the scope it runs under, the operand
/// stack it has built so far, and (boxed) the frame it will restore to.
/// Grounded on `mania/frame.py`'s `Frame`.
///
/// `parent` is `Option<Box<Frame>>` rather than `Arc`/`Mutex`: unlike a
/// `Scope` (shared across Processes via an exported Module), a frame
/// chain belongs to exactly one Process, ticked by exactly one VM on
/// exactly one thread at a time, so plain ownership is enough.
pub struct Frame {
    pub code: Code,
    pub scope: Arc<Scope>,
    pub position: u32,
    pub stack: Vec<Value>,
    pub parent: Option<Box<Frame>>,
    /// Jump targets installed by `SetupCatch`, innermost last. `Throw`
    /// pops from here before walking up to `parent`; `EndCatch` pops one
    /// off when a protected region exits normally.
    pub catch_targets: Vec<u32>,
    /// Set when the VM's tail-call/restore fusion rewrote this frame's
    /// `Restore`s to behave as `Return` (§4.3's second merging rule). The
    /// underlying code is shared (`Arc<ModuleData>`), so the rewrite is
    /// applied per-frame at dispatch time rather than to the bytes.
    pub treat_restore_as_return: bool,
}

impl Frame {
    pub fn new(code: Code, scope: Arc<Scope>, parent: Option<Box<Frame>>) -> Frame {
        let position = code.entry_point;
        Frame {
            code,
            scope,
            position,
            stack: Vec::new(),
            parent,
            catch_targets: Vec::new(),
            treat_restore_as_return: false,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    pub fn peek(&self, depth: u32) -> Option<&Value> {
        let len = self.stack.len();
        if (depth as usize) >= len {
            return None;
        }
        self.stack.get(len - 1 - depth as usize)
    }

    /// The window's end position: one past the last valid instruction.
    pub fn limit(&self) -> u32 {
        self.code.end()
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.limit()
    }

    /// The instruction immediately after `position`, without consuming
    /// it — used by the VM's tail-call/Restore fusion, which needs to
    /// inspect the suspended frame's *next* instruction before it runs.
    pub fn peek_next_instruction(&self) -> Option<mania_core::Instruction> {
        if self.at_end() {
            return None;
        }
        mania_core::Instruction::decode(&self.code.module.instructions, self.position)
            .ok()
            .map(|(instr, _)| instr)
    }
}
