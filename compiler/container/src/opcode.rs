//! Bytecode opcode definitions shared between the compiler and VM.
//!
//! The numeric encoding is a stable wire format: the verifier rejects any
//! byte outside this set.

/// Do nothing.
pub const NOP: u8 = 0;
/// Write a string-table entry to the text sink, followed by a newline.
/// Operand: u16 string-table index.
pub const PRINT: u8 = 1;
/// Drive a digital output pin high.
/// Operand: pin number in 0..=255, checked against the allow-list.
pub const LED_ON: u8 = 2;
/// Drive a digital output pin low.
/// Operand: pin number in 0..=255, checked against the allow-list.
pub const LED_OFF: u8 = 3;
/// Block the VM thread for the given number of milliseconds (max 60,000).
pub const DELAY: u8 = 4;
/// Push an i32 immediate.
pub const PUSH: u8 = 5;
/// Pop and discard the top of the stack.
pub const POP: u8 = 6;
/// Pop two values, push their sum (or concatenation when a string is involved).
pub const ADD: u8 = 7;
/// Pop two values, push their difference.
pub const SUB: u8 = 8;
/// Pop two values, push their product.
pub const MUL: u8 = 9;
/// Pop two values, push their quotient.
pub const DIV: u8 = 10;
/// Unconditional branch. Operand: absolute instruction index.
pub const JUMP: u8 = 11;
/// Pop a value; branch when it is truthy. Operand: absolute instruction index.
pub const JUMP_IF: u8 = 12;
/// Peek the top of the stack and write its textual form to the text sink.
pub const PRINT_NUM: u8 = 13;
/// Pop a value and bind it to a variable.
/// Operand: string-table index of the variable name.
pub const STORE: u8 = 14;
/// Push the value bound to a variable (integer zero when unbound).
/// Operand: string-table index of the variable name.
pub const LOAD: u8 = 15;
/// Pop two integers, push the remainder.
pub const MOD: u8 = 16;
/// Replace the top of the stack with its absolute value.
pub const ABS: u8 = 17;
/// Pop two values, push base raised to exponent.
pub const POW: u8 = 18;
/// Comparison opcodes push integer 0 for true and 1 for false.
pub const EQ: u8 = 19;
pub const NEQ: u8 = 20;
pub const LT: u8 = 21;
pub const GT: u8 = 22;
pub const LTE: u8 = 23;
pub const GTE: u8 = 24;
/// Push an f32 immediate, bit-cast into arg1.
pub const PUSH_FLOAT: u8 = 25;
/// Push a string value. Operand: u16 string-table index.
pub const PUSH_STRING: u8 = 26;
/// Pop two numeric values, push the larger.
pub const MAX: u8 = 27;
/// Pop two numeric values, push the smaller.
pub const MIN: u8 = 28;
/// Replace the top of the stack with its square root (always float).
pub const SQRT: u8 = 29;
/// Prompt the input source and bind the received value to a variable.
/// Operand: string-table index of the variable name.
pub const INPUT: u8 = 30;
/// Push a bool immediate (arg1 != 0).
pub const PUSH_BOOL: u8 = 31;
/// Trigonometric opcodes replace the top of the stack with a float result.
pub const SIN: u8 = 32;
pub const COS: u8 = 33;
pub const TAN: u8 = 34;
/// Stop the dispatch loop cleanly.
pub const HALT: u8 = 255;

/// True for the documented opcode set; everything else is rejected at load.
pub fn is_valid(op: u8) -> bool {
    op <= TAN || op == HALT
}

/// True for opcodes whose arg1 is a string-table index.
pub fn takes_string_index(op: u8) -> bool {
    matches!(op, PRINT | STORE | LOAD | PUSH_STRING | INPUT)
}

/// True for the branch opcodes whose arg1 is an instruction index.
pub fn is_jump(op: u8) -> bool {
    matches!(op, JUMP | JUMP_IF)
}

/// True for opcodes whose arg1 is a pin number.
pub fn is_pin_op(op: u8) -> bool {
    matches!(op, LED_ON | LED_OFF)
}

/// The mnemonic used by disassembly, or `None` for undocumented bytes.
pub fn mnemonic(op: u8) -> Option<&'static str> {
    let name = match op {
        NOP => "NOP",
        PRINT => "PRINT",
        LED_ON => "LED_ON",
        LED_OFF => "LED_OFF",
        DELAY => "DELAY",
        PUSH => "PUSH",
        POP => "POP",
        ADD => "ADD",
        SUB => "SUB",
        MUL => "MUL",
        DIV => "DIV",
        JUMP => "JUMP",
        JUMP_IF => "JUMP_IF",
        PRINT_NUM => "PRINT_NUM",
        STORE => "STORE",
        LOAD => "LOAD",
        MOD => "MOD",
        ABS => "ABS",
        POW => "POW",
        EQ => "EQ",
        NEQ => "NEQ",
        LT => "LT",
        GT => "GT",
        LTE => "LTE",
        GTE => "GTE",
        PUSH_FLOAT => "PUSH_FLOAT",
        PUSH_STRING => "PUSH_STRING",
        MAX => "MAX",
        MIN => "MIN",
        SQRT => "SQRT",
        INPUT => "INPUT",
        PUSH_BOOL => "PUSH_BOOL",
        SIN => "SIN",
        COS => "COS",
        TAN => "TAN",
        HALT => "HALT",
        _ => return None,
    };
    Some(name)
}
