//! Shared helpers for compiler integration tests.

use xeno_codegen::{compile, Compilation};
use xeno_container::Instruction;
use xeno_security::SecurityConfig;

#[allow(dead_code)]
pub fn compile_default(source: &str) -> Compilation {
    compile(source, &SecurityConfig::default())
}

/// The opcode bytes of the compiled program, in order.
#[allow(dead_code)]
pub fn ops(compilation: &Compilation) -> Vec<u8> {
    compilation.program.code.iter().map(|i| i.opcode).collect()
}

#[allow(dead_code)]
pub fn instr(compilation: &Compilation, index: usize) -> Instruction {
    compilation.program.code[index]
}

#[allow(dead_code)]
pub fn diagnostics(compilation: &Compilation) -> Vec<String> {
    compilation
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect()
}
