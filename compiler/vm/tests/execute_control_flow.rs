//! Branching, variables, printing, and pin side-effects.

mod common;

use common::{fixture, load, output};
use xeno_container::{opcode, Instruction, Value};
use xeno_vm::VmState;

fn int(v: i32) -> Instruction {
    Instruction::new(opcode::PUSH, v as u32)
}

fn op(code: u8) -> Instruction {
    Instruction::op(code)
}

#[test]
fn execute_jump_when_taken_then_skips_instructions() {
    let mut fx = fixture();
    // 0: JUMP 2, 1: PRINT "skipped", 2: HALT
    load(
        &mut fx.vm,
        vec![
            Instruction::new(opcode::JUMP, 2),
            Instruction::new(opcode::PRINT, 0),
            op(opcode::HALT),
        ],
        &["skipped"],
    );
    fx.vm.run(true);
    assert!(output(&fx.sink).is_empty());
    assert_eq!(fx.vm.state(), VmState::Halted);
}

#[test]
fn execute_jump_if_when_nonzero_then_jumps() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            int(1),
            Instruction::new(opcode::JUMP_IF, 3),
            Instruction::new(opcode::PRINT, 0),
            op(opcode::HALT),
        ],
        &["skipped"],
    );
    fx.vm.run(true);
    assert!(output(&fx.sink).is_empty());
}

#[test]
fn execute_jump_if_when_zero_then_falls_through() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            int(0),
            Instruction::new(opcode::JUMP_IF, 3),
            Instruction::new(opcode::PRINT, 0),
            op(opcode::HALT),
        ],
        &["printed"],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["printed"]);
}

#[test]
fn execute_jump_if_when_string_condition_then_empty_is_falsy() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            Instruction::new(opcode::PUSH_STRING, 0), // ""
            Instruction::new(opcode::JUMP_IF, 3),
            Instruction::new(opcode::PRINT, 1),
            op(opcode::HALT),
        ],
        &["", "printed"],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["printed"]);
}

#[test]
fn execute_store_load_when_roundtrip_then_value_preserved() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            int(42),
            Instruction::new(opcode::STORE, 0),
            Instruction::new(opcode::LOAD, 0),
            op(opcode::PRINT_NUM),
            op(opcode::HALT),
        ],
        &["x"],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["42"]);
    assert_eq!(fx.vm.variable("x"), Some(Value::Int(42)));
}

#[test]
fn execute_load_when_unbound_then_diagnostic_and_zero() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            Instruction::new(opcode::LOAD, 0),
            op(opcode::PRINT_NUM),
            op(opcode::HALT),
        ],
        &["ghost"],
    );
    fx.vm.run(true);
    assert_eq!(
        output(&fx.sink),
        vec!["ERROR: Variable not found: ghost", "0"]
    );
    assert_eq!(fx.vm.state(), VmState::Halted);
}

#[test]
fn execute_print_num_when_peeked_then_stack_unchanged() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![int(7), op(opcode::PRINT_NUM), op(opcode::PRINT_NUM), op(opcode::HALT)],
        &[],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["7", "7"]);
}

#[test]
fn execute_print_num_when_value_types_vary_then_formatting_rules() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            Instruction::with_float(opcode::PUSH_FLOAT, 1.5),
            op(opcode::PRINT_NUM),
            op(opcode::POP),
            Instruction::new(opcode::PUSH_BOOL, 1),
            op(opcode::PRINT_NUM),
            op(opcode::POP),
            Instruction::new(opcode::PUSH_STRING, 0),
            op(opcode::PRINT_NUM),
            op(opcode::HALT),
        ],
        &["text"],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["1.50", "true", "text"]);
}

#[test]
fn execute_led_when_allowed_pin_then_backend_and_echo() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![
            Instruction::new(opcode::LED_ON, 13),
            Instruction::new(opcode::LED_OFF, 13),
            op(opcode::HALT),
        ],
        &[],
    );
    fx.vm.run(true);
    assert_eq!(output(&fx.sink), vec!["LED ON pin 13", "LED OFF pin 13"]);
    assert_eq!(fx.pins.writes(), vec![(13, true), (13, false)]);
}

#[test]
fn execute_halt_when_mid_program_then_rest_not_executed() {
    let mut fx = fixture();
    load(
        &mut fx.vm,
        vec![op(opcode::HALT), Instruction::new(opcode::PRINT, 0)],
        &["unreached"],
    );
    fx.vm.run(true);
    assert!(output(&fx.sink).is_empty());
    assert_eq!(fx.vm.state(), VmState::Halted);
}

#[test]
fn execute_nop_when_stepped_then_no_effect() {
    let mut fx = fixture();
    load(&mut fx.vm, vec![op(opcode::NOP), op(opcode::HALT)], &[]);
    fx.vm.run(true);
    assert!(output(&fx.sink).is_empty());
    assert_eq!(fx.vm.stack_depth(), 0);
}

#[test]
fn execute_end_of_program_when_no_halt_then_halted_state() {
    let mut fx = fixture();
    load(&mut fx.vm, vec![int(1), op(opcode::POP)], &[]);
    fx.vm.run(true);
    assert_eq!(fx.vm.state(), VmState::Halted);
}
