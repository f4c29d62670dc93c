//! Overflow-checked integer arithmetic and typed comparisons.
//!
//! Signed arithmetic never silently wraps: operations that would overflow
//! report an [`ArithError`] and the calling opcode pushes zero. Comparison
//! results are encoded as integer 0 for true and 1 for false by the caller.

use std::fmt;

use xeno_container::{StringTable, Value};

use crate::error::Trap;

/// Absolute tolerance for float equality.
pub const FLOAT_EQ_TOLERANCE: f32 = 1e-4;

/// Non-fatal arithmetic failures. The VM reports the rendered line and
/// pushes a zero result, then continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithError {
    AddOverflow,
    SubOverflow,
    MulOverflow,
    PowOverflow,
    NegativeExponent,
    DivOverflow,
    DivideByZero,
    ModuloByZero,
    ModuloType,
    SqrtNegative,
    AbsOverflow,
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ArithError::AddOverflow => "ERROR: Integer overflow in addition",
            ArithError::SubOverflow => "ERROR: Integer overflow in subtraction",
            ArithError::MulOverflow => "ERROR: Integer overflow in multiplication",
            ArithError::PowOverflow => "ERROR: Integer overflow in power operation",
            ArithError::NegativeExponent => "ERROR: Negative exponent in power operation",
            ArithError::DivOverflow => "ERROR: Integer overflow in division",
            ArithError::DivideByZero => "ERROR: Division by zero",
            ArithError::ModuloByZero => "ERROR: Modulo by zero",
            ArithError::ModuloType => "ERROR: Modulo requires integer operands",
            ArithError::SqrtNegative => "ERROR: Square root of negative number",
            ArithError::AbsOverflow => "ERROR: Integer overflow in absolute value",
        };
        f.write_str(message)
    }
}

impl std::error::Error for ArithError {}

pub fn checked_add(a: i32, b: i32) -> Result<i32, ArithError> {
    a.checked_add(b).ok_or(ArithError::AddOverflow)
}

pub fn checked_sub(a: i32, b: i32) -> Result<i32, ArithError> {
    a.checked_sub(b).ok_or(ArithError::SubOverflow)
}

pub fn checked_mul(a: i32, b: i32) -> Result<i32, ArithError> {
    a.checked_mul(b).ok_or(ArithError::MulOverflow)
}

/// Integer division. `i32::MIN / -1` counts as overflow.
pub fn checked_div(a: i32, b: i32) -> Result<i32, ArithError> {
    if b == 0 {
        return Err(ArithError::DivideByZero);
    }
    a.checked_div(b).ok_or(ArithError::DivOverflow)
}

/// Integer remainder. Modulo by zero is an error; `i32::MIN % -1` yields
/// zero without error.
pub fn checked_mod(a: i32, b: i32) -> Result<i32, ArithError> {
    if b == 0 {
        return Err(ArithError::ModuloByZero);
    }
    Ok(a.checked_rem(b).unwrap_or(0))
}

/// Integer power by repeated multiplication with overflow checks.
/// Negative exponents are rejected.
pub fn checked_pow(base: i32, exponent: i32) -> Result<i32, ArithError> {
    if exponent < 0 {
        return Err(ArithError::NegativeExponent);
    }
    if exponent == 0 {
        return Ok(1);
    }
    if base == 0 {
        return Ok(0);
    }

    let mut result: i32 = 1;
    for _ in 0..exponent {
        result = result.checked_mul(base).ok_or(ArithError::PowOverflow)?;
    }
    Ok(result)
}

/// The comparison carried by a comparison opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

/// Compares two values.
///
/// Equal types compare directly; mixed int/float promote to float; any
/// other mixed-type pairing is false except `!=`. Float equality uses an
/// absolute-difference tolerance. String comparison resolves both interned
/// contents and is lexicographic; a dangling index is fatal.
pub fn compare(a: Value, b: Value, op: CmpOp, strings: &StringTable) -> Result<bool, Trap> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(compare_ord(x, y, op)),
        (Value::Float(x), Value::Float(y)) => Ok(compare_floats(x, y, op)),
        (Value::Bool(x), Value::Bool(y)) => Ok(compare_ord(x, y, op)),
        (Value::Str(x), Value::Str(y)) => {
            let sa = strings.get(x as u32).ok_or(Trap::InvalidStringIndex)?;
            let sb = strings.get(y as u32).ok_or(Trap::InvalidStringIndex)?;
            Ok(compare_ord(sa, sb, op))
        }
        _ if a.is_numeric() && b.is_numeric() => Ok(compare_floats(a.as_f32(), b.as_f32(), op)),
        _ => Ok(op == CmpOp::Neq),
    }
}

fn compare_ord<T: PartialOrd>(a: T, b: T, op: CmpOp) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Neq => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Lte => a <= b,
        CmpOp::Gte => a >= b,
    }
}

fn compare_floats(a: f32, b: f32, op: CmpOp) -> bool {
    match op {
        CmpOp::Eq => (a - b).abs() < FLOAT_EQ_TOLERANCE,
        CmpOp::Neq => (a - b).abs() >= FLOAT_EQ_TOLERANCE,
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Lte => a <= b,
        CmpOp::Gte => a >= b,
    }
}
