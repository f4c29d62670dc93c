//! Security policy and load-time verification for the Xeno toolchain.
//!
//! [`SecurityConfig`] holds the validated tunables read by both the compiler
//! (depth limits) and the VM (stack size, pin allow-list, instruction
//! ceiling). [`verify`] is the whole-artifact check that runs on every
//! program load; everything it accepts is safe for the dispatch loop to
//! execute without re-deriving bounds.

mod config;
mod verify;

pub use config::{
    ConfigError, SecurityConfig, LED_BUILTIN, MAX_EXPRESSION_DEPTH_LIMIT, MAX_IF_DEPTH_LIMIT,
    MAX_INSTRUCTIONS_LIMIT, MAX_LOOP_DEPTH_LIMIT, MAX_PIN_NUMBER, MAX_STACK_SIZE_LIMIT,
    MAX_STRING_LENGTH_LIMIT, MAX_VARIABLE_NAME_LENGTH_LIMIT, MIN_EXPRESSION_DEPTH, MIN_IF_DEPTH,
    MIN_INSTRUCTIONS_LIMIT, MIN_LOOP_DEPTH, MIN_PIN_NUMBER, MIN_STACK_SIZE, MIN_STRING_LENGTH,
    MIN_VARIABLE_NAME_LENGTH,
};
pub use verify::{verify, VerifyError, MAX_DELAY_MS, MAX_PROGRAM_LENGTH, MAX_VERIFIED_STRINGS};
