//! Sandboxed stack virtual machine for Xeno bytecode.
//!
//! A program is admitted only through load-time verification; the dispatch
//! loop then executes it under per-execution resource bounds (instruction
//! and iteration ceilings, a fixed-capacity operand stack). All observable
//! output flows through injected sinks so hosts and tests control the
//! boundary.

pub mod arith;
mod error;
mod io;
mod stack;
mod variables;
mod vm;

pub use error::Trap;
pub use io::{InputQueue, MemorySink, NullPins, PinBackend, StdoutSink, TextSink};
pub use stack::OperandStack;
pub use variables::VariableTable;
pub use vm::{StopHandle, Vm, VmState, INPUT_TIMEOUT, MAX_ITERATIONS};

pub const VM_NAME: &str = "Xeno Virtual Machine";
pub const VM_VERSION: &str = "v0.1.3";
pub const VM_DATE: &str = "08.11.2025";
