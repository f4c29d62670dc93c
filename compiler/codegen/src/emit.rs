//! Low-level bytecode emitter.
//!
//! Accumulates instructions, exposes the current address for control-flow
//! bookkeeping, and back-patches branch targets once they are known.

use xeno_container::Instruction;

/// The emitter refuses to grow a program past this many instructions.
pub(crate) const MAX_PROGRAM_INSTRUCTIONS: usize = 65_535;

pub(crate) struct Emitter {
    code: Vec<Instruction>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            code: Vec::with_capacity(128),
        }
    }

    /// Appends one instruction; false when the program is full.
    pub fn emit(&mut self, instr: Instruction) -> bool {
        if self.code.len() >= MAX_PROGRAM_INSTRUCTIONS {
            return false;
        }
        self.code.push(instr);
        true
    }

    /// The index the next emitted instruction will occupy.
    pub fn current_address(&self) -> usize {
        self.code.len()
    }

    /// Writes a branch target into an already-emitted instruction.
    pub fn patch_arg1(&mut self, address: usize, value: u32) {
        if let Some(instr) = self.code.get_mut(address) {
            instr.arg1 = value;
        }
    }

    pub fn last_opcode(&self) -> Option<u8> {
        self.code.last().map(|i| i.opcode)
    }

    pub fn into_code(self) -> Vec<Instruction> {
        self.code
    }
}
