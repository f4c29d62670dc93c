//! Arithmetic, promotion, and comparison semantics.

mod common;

use common::{fixture, load, output};
use xeno_container::{opcode, Instruction, Value};
use xeno_vm::VmState;

fn int(v: i32) -> Instruction {
    Instruction::new(opcode::PUSH, v as u32)
}

fn float(v: f32) -> Instruction {
    Instruction::with_float(opcode::PUSH_FLOAT, v)
}

fn op(code: u8) -> Instruction {
    Instruction::op(code)
}

/// Runs bytecode that leaves its result bound to `r` via STORE.
fn run_store(code: &mut Vec<Instruction>, strings: &[&str]) -> (common::VmFixture, Value) {
    code.push(Instruction::new(opcode::STORE, (strings.len() - 1) as u32));
    code.push(op(opcode::HALT));
    let mut fx = fixture();
    assert!(load(&mut fx.vm, code.clone(), strings));
    fx.vm.run(true);
    let value = fx.vm.variable("r").expect("result bound");
    (fx, value)
}

#[test]
fn execute_add_when_ints_then_int_sum() {
    let (_, v) = run_store(&mut vec![int(2), int(3), op(opcode::ADD)], &["r"]);
    assert_eq!(v, Value::Int(5));
}

#[test]
fn execute_add_when_mixed_then_float_result() {
    let (_, v) = run_store(&mut vec![int(2), float(0.5), op(opcode::ADD)], &["r"]);
    assert_eq!(v, Value::Float(2.5));
}

#[test]
fn execute_add_when_overflow_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(i32::MAX), int(1), op(opcode::ADD)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Integer overflow in addition"));
    assert_eq!(fx.vm.state(), VmState::Halted);
}

#[test]
fn execute_sub_when_overflow_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(i32::MIN), int(1), op(opcode::SUB)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Integer overflow in subtraction"));
}

#[test]
fn execute_mul_when_overflow_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(65_536), int(65_536), op(opcode::MUL)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Integer overflow in multiplication"));
}

#[test]
fn execute_div_when_ints_then_truncating() {
    let (_, v) = run_store(&mut vec![int(7), int(2), op(opcode::DIV)], &["r"]);
    assert_eq!(v, Value::Int(3));
}

#[test]
fn execute_div_when_by_zero_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(7), int(0), op(opcode::DIV)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Division by zero"));
}

#[test]
fn execute_div_when_min_by_minus_one_then_overflow_diagnostic() {
    let (fx, v) = run_store(&mut vec![int(i32::MIN), int(-1), op(opcode::DIV)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Integer overflow in division"));
}

#[test]
fn execute_div_when_float_by_zero_then_float_zero() {
    let (fx, v) = run_store(&mut vec![float(1.0), float(0.0), op(opcode::DIV)], &["r"]);
    assert_eq!(v, Value::Float(0.0));
    assert!(fx.sink.contains("ERROR: Division by zero"));
}

#[test]
fn execute_mod_when_ints_then_remainder() {
    let (_, v) = run_store(&mut vec![int(7), int(3), op(opcode::MOD)], &["r"]);
    assert_eq!(v, Value::Int(1));
}

#[test]
fn execute_mod_when_by_zero_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(7), int(0), op(opcode::MOD)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Modulo by zero"));
}

#[test]
fn execute_mod_when_min_by_minus_one_then_zero_without_diagnostic() {
    let (fx, v) = run_store(&mut vec![int(i32::MIN), int(-1), op(opcode::MOD)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(!fx.sink.lines().iter().any(|l| l.starts_with("ERROR:")));
}

#[test]
fn execute_mod_when_float_operand_then_type_diagnostic() {
    let (fx, v) = run_store(&mut vec![float(7.0), int(3), op(opcode::MOD)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Modulo requires integer operands"));
}

#[test]
fn execute_pow_when_ints_then_repeated_multiplication() {
    let (_, v) = run_store(&mut vec![int(2), int(10), op(opcode::POW)], &["r"]);
    assert_eq!(v, Value::Int(1024));
}

#[test]
fn execute_pow_when_zero_exponent_then_one() {
    let (_, v) = run_store(&mut vec![int(9), int(0), op(opcode::POW)], &["r"]);
    assert_eq!(v, Value::Int(1));
}

#[test]
fn execute_pow_when_overflow_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(2), int(31), op(opcode::POW)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Integer overflow in power operation"));
}

#[test]
fn execute_pow_when_negative_exponent_then_zero() {
    let (_, v) = run_store(&mut vec![int(2), int(-1), op(opcode::POW)], &["r"]);
    assert_eq!(v, Value::Int(0));
}

#[test]
fn execute_pow_when_float_then_host_pow() {
    let (_, v) = run_store(&mut vec![float(2.0), float(0.5), op(opcode::POW)], &["r"]);
    match v {
        Value::Float(f) => assert!((f - std::f32::consts::SQRT_2).abs() < 1e-6),
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn execute_abs_when_negative_int_then_positive() {
    let (_, v) = run_store(&mut vec![int(-5), op(opcode::ABS)], &["r"]);
    assert_eq!(v, Value::Int(5));
}

#[test]
fn execute_abs_when_int_min_then_saturates_with_diagnostic() {
    let (fx, v) = run_store(&mut vec![int(i32::MIN), op(opcode::ABS)], &["r"]);
    assert_eq!(v, Value::Int(i32::MAX));
    assert!(fx.sink.contains("ERROR: Integer overflow in absolute value"));
}

#[test]
fn execute_sqrt_when_int_then_float_root() {
    let (_, v) = run_store(&mut vec![int(16), op(opcode::SQRT)], &["r"]);
    assert_eq!(v, Value::Float(4.0));
}

#[test]
fn execute_sqrt_when_negative_then_diagnostic_and_zero() {
    let (fx, v) = run_store(&mut vec![int(-4), op(opcode::SQRT)], &["r"]);
    assert_eq!(v, Value::Int(0));
    assert!(fx.sink.contains("ERROR: Square root of negative number"));
}

#[test]
fn execute_trig_when_zero_then_known_values() {
    let (_, v) = run_store(&mut vec![int(0), op(opcode::SIN)], &["r"]);
    assert_eq!(v, Value::Float(0.0));
    let (_, v) = run_store(&mut vec![int(0), op(opcode::COS)], &["r"]);
    assert_eq!(v, Value::Float(1.0));
    let (_, v) = run_store(&mut vec![int(0), op(opcode::TAN)], &["r"]);
    assert_eq!(v, Value::Float(0.0));
}

#[test]
fn execute_max_min_when_mixed_then_promoted() {
    let (_, v) = run_store(&mut vec![int(2), float(3.5), op(opcode::MAX)], &["r"]);
    assert_eq!(v, Value::Float(3.5));
    let (_, v) = run_store(&mut vec![int(2), float(3.5), op(opcode::MIN)], &["r"]);
    assert_eq!(v, Value::Float(2.0));
}

#[test]
fn execute_comparison_when_true_then_pushes_zero() {
    let (_, v) = run_store(&mut vec![int(1), int(1), op(opcode::EQ)], &["r"]);
    assert_eq!(v, Value::Int(0));
    let (_, v) = run_store(&mut vec![int(1), int(2), op(opcode::LT)], &["r"]);
    assert_eq!(v, Value::Int(0));
}

#[test]
fn execute_comparison_when_false_then_pushes_one() {
    let (_, v) = run_store(&mut vec![int(1), int(2), op(opcode::EQ)], &["r"]);
    assert_eq!(v, Value::Int(1));
    let (_, v) = run_store(&mut vec![int(2), int(1), op(opcode::LT)], &["r"]);
    assert_eq!(v, Value::Int(1));
}

#[test]
fn execute_comparison_when_float_near_then_equal_within_tolerance() {
    let (_, v) = run_store(
        &mut vec![float(1.0), float(1.00001), op(opcode::EQ)],
        &["r"],
    );
    assert_eq!(v, Value::Int(0));
}

#[test]
fn execute_comparison_when_types_incompatible_then_neq_only() {
    let (_, v) = run_store(
        &mut vec![int(1), Instruction::new(opcode::PUSH_BOOL, 1), op(opcode::NEQ)],
        &["r"],
    );
    assert_eq!(v, Value::Int(0)); // true: the values differ in type
    let (_, v) = run_store(
        &mut vec![int(1), Instruction::new(opcode::PUSH_BOOL, 1), op(opcode::EQ)],
        &["r"],
    );
    assert_eq!(v, Value::Int(1));
}

#[test]
fn execute_add_when_non_numeric_operands_then_zero() {
    let (fx, v) = run_store(
        &mut vec![
            Instruction::new(opcode::PUSH_BOOL, 1),
            Instruction::new(opcode::PUSH_BOOL, 0),
            op(opcode::ADD),
        ],
        &["r"],
    );
    assert_eq!(v, Value::Int(0));
    assert!(output(&fx.sink).is_empty());
}
