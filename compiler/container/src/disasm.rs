//! Textual rendering of instructions, shared by the VM's disassembler and
//! the compiler's code listing.
//!
//! One instruction renders as `<mnemonic> [<operand>]`. String-indexed
//! operands resolve against the table: literals as `"content"`, variable
//! and input names bare. Indices outside the table render `<invalid>`.

use crate::{opcode, Instruction, StringTable};

/// Renders one instruction without its index prefix.
pub fn render_instruction(instr: &Instruction, strings: &StringTable) -> String {
    match instr.opcode {
        opcode::PRINT => match strings.get(instr.arg1) {
            Some(s) => format!("PRINT \"{s}\""),
            None => "PRINT <invalid>".to_string(),
        },
        opcode::PUSH_STRING => match strings.get(instr.arg1) {
            Some(s) => format!("PUSH_STRING \"{s}\""),
            None => "PUSH_STRING <invalid>".to_string(),
        },
        opcode::STORE => render_name_operand("STORE", instr.arg1, strings),
        opcode::LOAD => render_name_operand("LOAD", instr.arg1, strings),
        opcode::INPUT => render_name_operand("INPUT", instr.arg1, strings),
        opcode::LED_ON => format!("LED_ON pin={}", instr.arg1),
        opcode::LED_OFF => format!("LED_OFF pin={}", instr.arg1),
        opcode::DELAY => format!("DELAY {}ms", instr.arg1),
        opcode::PUSH => format!("PUSH {}", instr.arg1 as i32),
        opcode::PUSH_FLOAT => format!("PUSH_FLOAT {:.4}", instr.float_arg()),
        opcode::PUSH_BOOL => {
            format!("PUSH_BOOL {}", if instr.arg1 != 0 { "true" } else { "false" })
        }
        opcode::JUMP => format!("JUMP {}", instr.arg1),
        opcode::JUMP_IF => format!("JUMP_IF {}", instr.arg1),
        op => match opcode::mnemonic(op) {
            Some(name) => name.to_string(),
            None => format!("UNKNOWN {op}"),
        },
    }
}

/// Renders a full listing, one `<index>: <mnemonic> [<operand>]` line per
/// instruction.
pub fn render_listing(code: &[Instruction], strings: &StringTable) -> Vec<String> {
    code.iter()
        .enumerate()
        .map(|(i, instr)| format!("{i}: {}", render_instruction(instr, strings)))
        .collect()
}

fn render_name_operand(mnemonic: &str, arg1: u32, strings: &StringTable) -> String {
    match strings.get(arg1) {
        Some(s) => format!("{mnemonic} {s}"),
        None => format!("{mnemonic} <invalid>"),
    }
}
