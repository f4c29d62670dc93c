use std::fmt;

/// The conventional status pin, allowed by default.
pub const LED_BUILTIN: u8 = 13;

/// Compile-time bounds for each tunable. Setters reject values outside
/// these ranges without mutating state.
pub const MIN_STRING_LENGTH: u16 = 1;
pub const MAX_STRING_LENGTH_LIMIT: u16 = 4096;
pub const MIN_VARIABLE_NAME_LENGTH: u16 = 1;
pub const MAX_VARIABLE_NAME_LENGTH_LIMIT: u16 = 256;
pub const MIN_EXPRESSION_DEPTH: u16 = 1;
pub const MAX_EXPRESSION_DEPTH_LIMIT: u16 = 256;
pub const MIN_LOOP_DEPTH: u16 = 1;
pub const MAX_LOOP_DEPTH_LIMIT: u16 = 64;
pub const MIN_IF_DEPTH: u16 = 1;
pub const MAX_IF_DEPTH_LIMIT: u16 = 64;
pub const MIN_STACK_SIZE: u16 = 16;
pub const MAX_STACK_SIZE_LIMIT: u16 = 2048;
pub const MIN_INSTRUCTIONS_LIMIT: u32 = 1_000;
pub const MAX_INSTRUCTIONS_LIMIT: u32 = 1_000_000;
pub const MIN_PIN_NUMBER: u16 = 0;
pub const MAX_PIN_NUMBER: u16 = 255;

/// A rejected configuration change. The existing value is preserved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    OutOfRange {
        name: &'static str,
        min: u32,
        max: u32,
    },
    InvalidPin {
        pin: u16,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { name, min, max } => {
                write!(f, "SECURITY: {name} must be between {min} and {max}")
            }
            ConfigError::InvalidPin { pin } => write!(
                f,
                "SECURITY: Invalid pin number ({pin}). Must be between {MIN_PIN_NUMBER} and {MAX_PIN_NUMBER}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated tunables shared by the compiler and the VM.
///
/// The facade owns the single mutable instance; everything else reads it.
/// Each setter range-checks its argument and leaves state untouched on
/// failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityConfig {
    max_string_length: u16,
    max_variable_name_length: u16,
    max_expression_depth: u16,
    max_loop_depth: u16,
    max_if_depth: u16,
    max_stack_size: u16,
    max_instructions: u32,
    allowed_pins: Vec<u8>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            max_string_length: 256,
            max_variable_name_length: 32,
            max_expression_depth: 32,
            max_loop_depth: 16,
            max_if_depth: 16,
            max_stack_size: 256,
            max_instructions: 10_000,
            allowed_pins: vec![LED_BUILTIN],
        }
    }
}

impl SecurityConfig {
    pub fn new() -> Self {
        SecurityConfig::default()
    }

    pub fn max_string_length(&self) -> u16 {
        self.max_string_length
    }

    pub fn max_variable_name_length(&self) -> u16 {
        self.max_variable_name_length
    }

    pub fn max_expression_depth(&self) -> u16 {
        self.max_expression_depth
    }

    pub fn max_loop_depth(&self) -> u16 {
        self.max_loop_depth
    }

    pub fn max_if_depth(&self) -> u16 {
        self.max_if_depth
    }

    pub fn max_stack_size(&self) -> u16 {
        self.max_stack_size
    }

    pub fn max_instructions(&self) -> u32 {
        self.max_instructions
    }

    pub fn allowed_pins(&self) -> &[u8] {
        &self.allowed_pins
    }

    pub fn set_max_string_length(&mut self, length: u16) -> Result<(), ConfigError> {
        check_range(
            length,
            MIN_STRING_LENGTH,
            MAX_STRING_LENGTH_LIMIT,
            "MAX_STRING_LENGTH",
        )?;
        self.max_string_length = length;
        Ok(())
    }

    pub fn set_max_variable_name_length(&mut self, length: u16) -> Result<(), ConfigError> {
        check_range(
            length,
            MIN_VARIABLE_NAME_LENGTH,
            MAX_VARIABLE_NAME_LENGTH_LIMIT,
            "MAX_VARIABLE_NAME_LENGTH",
        )?;
        self.max_variable_name_length = length;
        Ok(())
    }

    pub fn set_max_expression_depth(&mut self, depth: u16) -> Result<(), ConfigError> {
        check_range(
            depth,
            MIN_EXPRESSION_DEPTH,
            MAX_EXPRESSION_DEPTH_LIMIT,
            "MAX_EXPRESSION_DEPTH",
        )?;
        self.max_expression_depth = depth;
        Ok(())
    }

    pub fn set_max_loop_depth(&mut self, depth: u16) -> Result<(), ConfigError> {
        check_range(depth, MIN_LOOP_DEPTH, MAX_LOOP_DEPTH_LIMIT, "MAX_LOOP_DEPTH")?;
        self.max_loop_depth = depth;
        Ok(())
    }

    pub fn set_max_if_depth(&mut self, depth: u16) -> Result<(), ConfigError> {
        check_range(depth, MIN_IF_DEPTH, MAX_IF_DEPTH_LIMIT, "MAX_IF_DEPTH")?;
        self.max_if_depth = depth;
        Ok(())
    }

    pub fn set_max_stack_size(&mut self, size: u16) -> Result<(), ConfigError> {
        check_range(size, MIN_STACK_SIZE, MAX_STACK_SIZE_LIMIT, "MAX_STACK_SIZE")?;
        self.max_stack_size = size;
        Ok(())
    }

    pub fn set_max_instructions(&mut self, max_instructions: u32) -> Result<(), ConfigError> {
        if !(MIN_INSTRUCTIONS_LIMIT..=MAX_INSTRUCTIONS_LIMIT).contains(&max_instructions) {
            return Err(ConfigError::OutOfRange {
                name: "max_instructions",
                min: MIN_INSTRUCTIONS_LIMIT,
                max: MAX_INSTRUCTIONS_LIMIT,
            });
        }
        self.max_instructions = max_instructions;
        Ok(())
    }

    /// Replaces the pin allow-list. Every entry must fit in 0..=255; the
    /// list is rejected as a whole otherwise.
    pub fn set_allowed_pins(&mut self, pins: &[u16]) -> Result<(), ConfigError> {
        for &pin in pins {
            if pin > MAX_PIN_NUMBER {
                return Err(ConfigError::InvalidPin { pin });
            }
        }
        self.allowed_pins = pins.iter().map(|&p| p as u8).collect();
        Ok(())
    }

    pub fn is_pin_allowed(&self, pin: u8) -> bool {
        self.allowed_pins.contains(&pin)
    }

    /// Re-runs every setter against the current state; a coherent
    /// configuration passes all of them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut probe = self.clone();
        probe.set_max_string_length(self.max_string_length)?;
        probe.set_max_variable_name_length(self.max_variable_name_length)?;
        probe.set_max_expression_depth(self.max_expression_depth)?;
        probe.set_max_loop_depth(self.max_loop_depth)?;
        probe.set_max_if_depth(self.max_if_depth)?;
        probe.set_max_stack_size(self.max_stack_size)?;
        probe.set_max_instructions(self.max_instructions)?;
        let pins: Vec<u16> = self.allowed_pins.iter().map(|&p| p as u16).collect();
        probe.set_allowed_pins(&pins)?;
        Ok(())
    }

    /// A multi-line summary of the compile-time bounds.
    pub fn security_limits_info(&self) -> String {
        format!(
            "Security Limits:\n\
             String Length: {MIN_STRING_LENGTH} - {MAX_STRING_LENGTH_LIMIT}\n\
             Variable Name: {MIN_VARIABLE_NAME_LENGTH} - {MAX_VARIABLE_NAME_LENGTH_LIMIT}\n\
             Expression Depth: {MIN_EXPRESSION_DEPTH} - {MAX_EXPRESSION_DEPTH_LIMIT}\n\
             Loop Depth: {MIN_LOOP_DEPTH} - {MAX_LOOP_DEPTH_LIMIT}\n\
             If Depth: {MIN_IF_DEPTH} - {MAX_IF_DEPTH_LIMIT}\n\
             Stack Size: {MIN_STACK_SIZE} - {MAX_STACK_SIZE_LIMIT}\n\
             Instructions: {MIN_INSTRUCTIONS_LIMIT} - {MAX_INSTRUCTIONS_LIMIT}\n\
             Pin Numbers: {MIN_PIN_NUMBER} - {MAX_PIN_NUMBER}"
        )
    }
}

fn check_range(value: u16, min: u16, max: u16, name: &'static str) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            min: min as u32,
            max: max as u32,
        });
    }
    Ok(())
}
