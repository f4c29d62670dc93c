//! Lowers Xeno source text into stack bytecode.
//!
//! The compiler is a single pass over source lines. Each line is a command;
//! `set`, `if`, and `for` arguments carry infix expressions that are
//! compiled via constant substitution, a function-call rewrite, a tokenizer,
//! and a shunting-yard conversion to postfix. Control flow back-patches
//! forward jumps once the matching terminator is seen.
//!
//! Compilation never aborts: invalid lines are reported as diagnostics and
//! skipped so later lines still produce bytecode.

mod compile;
mod emit;
mod expr;

pub use compile::{compile, Compilation};

pub const COMPILER_NAME: &str = "Xeno Compiler";
pub const COMPILER_VERSION: &str = "v0.1.3";
pub const COMPILER_DATE: &str = "08.11.2025";
