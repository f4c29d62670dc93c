use std::fmt;

use xeno_container::{opcode, Instruction};

use crate::SecurityConfig;

/// Largest program the verifier will accept.
pub const MAX_PROGRAM_LENGTH: usize = 10_000;
/// Largest string table the verifier will accept.
pub const MAX_VERIFIED_STRINGS: usize = 1_000;
/// Ceiling for a single DELAY, in milliseconds.
pub const MAX_DELAY_MS: u32 = 60_000;
/// Programs longer than this must contain a HALT.
const HALT_FREE_LIMIT: usize = 10;

/// A verification failure. The load fails atomically and the program is
/// not retained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    ProgramTooLarge,
    StringTableTooLarge,
    InvalidOpcode { at: usize },
    InvalidJumpTarget { at: usize },
    InvalidStringIndex { at: usize },
    UnauthorizedPin { at: usize },
    ExcessiveDelay { at: usize },
    MissingHalt,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::ProgramTooLarge => write!(f, "SECURITY: Program too large"),
            VerifyError::StringTableTooLarge => write!(f, "SECURITY: String table too large"),
            VerifyError::InvalidOpcode { at } => {
                write!(f, "SECURITY: Invalid opcode at instruction {at}")
            }
            VerifyError::InvalidJumpTarget { at } => {
                write!(f, "SECURITY: Invalid jump target at instruction {at}")
            }
            VerifyError::InvalidStringIndex { at } => {
                write!(f, "SECURITY: Invalid string index at instruction {at}")
            }
            VerifyError::UnauthorizedPin { at } => {
                write!(f, "SECURITY: Unauthorized pin access at instruction {at}")
            }
            VerifyError::ExcessiveDelay { at } => {
                write!(f, "SECURITY: Excessive delay at instruction {at}")
            }
            VerifyError::MissingHalt => write!(f, "SECURITY: Program missing HALT instruction"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Verifies a program against the string table the VM will actually use.
///
/// Runs once per load, before any instruction executes, and is total on the
/// artifact: nothing is interpreted. The checks run in documented order and
/// the first failure wins.
pub fn verify(
    code: &[Instruction],
    strings: &[String],
    config: &SecurityConfig,
) -> Result<(), VerifyError> {
    if code.len() > MAX_PROGRAM_LENGTH {
        return Err(VerifyError::ProgramTooLarge);
    }

    if strings.len() > MAX_VERIFIED_STRINGS {
        return Err(VerifyError::StringTableTooLarge);
    }

    for (at, instr) in code.iter().enumerate() {
        if !opcode::is_valid(instr.opcode) {
            return Err(VerifyError::InvalidOpcode { at });
        }

        if opcode::is_jump(instr.opcode) && instr.arg1 as usize >= code.len() {
            return Err(VerifyError::InvalidJumpTarget { at });
        }

        if opcode::takes_string_index(instr.opcode) && instr.arg1 as usize >= strings.len() {
            return Err(VerifyError::InvalidStringIndex { at });
        }

        if opcode::is_pin_op(instr.opcode) {
            let allowed = instr.arg1 <= u8::MAX as u32 && config.is_pin_allowed(instr.arg1 as u8);
            if !allowed {
                return Err(VerifyError::UnauthorizedPin { at });
            }
        }

        if instr.opcode == opcode::DELAY && instr.arg1 > MAX_DELAY_MS {
            return Err(VerifyError::ExcessiveDelay { at });
        }
    }

    let has_halt = code.iter().any(|i| i.opcode == opcode::HALT);
    if !has_halt && code.len() > HALT_FREE_LIMIT {
        return Err(VerifyError::MissingHalt);
    }

    Ok(())
}
