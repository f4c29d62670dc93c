//! Line-oriented command compiler.
//!
//! Each source line is a command; the first whitespace-delimited token
//! selects a handler (case-insensitive) and the remainder is its argument
//! text. Handlers emit bytecode through the shared [`Emitter`], interning
//! literals and variable names into the program's string table.

use std::collections::HashMap;

use xeno_container::{opcode, Diagnostic, Instruction, Program, Severity, StringTable};
use xeno_security::SecurityConfig;

use crate::emit::Emitter;
use crate::expr;

/// Longest accepted source line, after comment stripping and trimming.
const MAX_LINE_LENGTH: usize = 512;
/// Ceiling for a single DELAY immediate, in milliseconds.
const MAX_DELAY_MS: i64 = 60_000;

/// Commands that lower to exactly one operand-free instruction.
const SIMPLE_COMMANDS: &[(&str, u8)] = &[
    ("printnum", opcode::PRINT_NUM),
    ("pop", opcode::POP),
    ("add", opcode::ADD),
    ("sub", opcode::SUB),
    ("mul", opcode::MUL),
    ("div", opcode::DIV),
    ("mod", opcode::MOD),
    ("abs", opcode::ABS),
    ("pow", opcode::POW),
    ("max", opcode::MAX),
    ("min", opcode::MIN),
    ("sqrt", opcode::SQRT),
    ("halt", opcode::HALT),
];

/// The result of compiling one source text.
pub struct Compilation {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// True when no error-severity diagnostic was produced. Warnings alone
    /// do not fail a compile.
    pub fn is_ok(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity == Severity::Warning)
    }
}

/// Compiles Xeno source text into a bytecode program.
///
/// Compilation is total: invalid lines are reported and skipped so later
/// lines still produce bytecode, and the emitted program always ends with
/// HALT.
pub fn compile(source: &str, policy: &SecurityConfig) -> Compilation {
    let mut compiler = Compiler::new(policy);
    compiler.run(source);
    compiler.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VarType {
    Int,
    Float,
    Str,
    Bool,
}

/// Compile-time record of an open `for` loop, popped by `endfor`.
struct LoopFrame {
    var_name: String,
    start_address: usize,
    condition_address: usize,
}

struct Compiler<'p> {
    policy: &'p SecurityConfig,
    emitter: Emitter,
    strings: StringTable,
    variable_types: HashMap<String, VarType>,
    if_stack: Vec<usize>,
    loop_stack: Vec<LoopFrame>,
    diagnostics: Vec<Diagnostic>,
}

impl<'p> Compiler<'p> {
    fn new(policy: &'p SecurityConfig) -> Self {
        Compiler {
            policy,
            emitter: Emitter::new(),
            strings: StringTable::new(),
            variable_types: HashMap::new(),
            if_stack: Vec::new(),
            loop_stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self, source: &str) {
        for (i, line) in source.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            self.compile_line(line, i + 1);
        }

        if self.emitter.last_opcode() != Some(opcode::HALT) {
            self.emit(opcode::HALT, 0);
        }
    }

    fn finish(self) -> Compilation {
        Compilation {
            program: Program {
                code: self.emitter.into_code(),
                strings: self.strings,
            },
            diagnostics: self.diagnostics,
        }
    }

    fn compile_line(&mut self, line: &str, line_number: usize) {
        let cleaned = clean_line(line);
        if cleaned.is_empty() {
            return;
        }
        if cleaned.len() > MAX_LINE_LENGTH {
            self.error(format!("Line too long at line {line_number}"));
            return;
        }

        let (command, args) = match cleaned.find(' ') {
            Some(pos) => (
                cleaned[..pos].to_lowercase(),
                cleaned[pos + 1..].trim().to_string(),
            ),
            None => (cleaned.to_lowercase(), String::new()),
        };

        if let Some(&(_, op)) = SIMPLE_COMMANDS.iter().find(|(name, _)| *name == command) {
            self.emit(op, 0);
            return;
        }

        match command.as_str() {
            "print" => self.compile_print(&args, line_number),
            "led" => self.compile_led(&args, line_number),
            "delay" => self.compile_delay(&args, line_number),
            "push" => self.compile_push(&args),
            "input" => self.compile_input(&args, line_number),
            "set" => self.compile_set(&args, line_number),
            "if" => self.compile_if(&args, line_number),
            "else" => self.compile_else(line_number),
            "endif" => self.compile_endif(line_number),
            "for" => self.compile_for(&args, line_number),
            "endfor" => self.compile_endfor(line_number),
            _ => self.warning(format!("Unknown command at line {line_number}: {command}")),
        }
    }

    fn compile_print(&mut self, args: &str, line_number: usize) {
        let var_name = args.strip_prefix('$').unwrap_or("");
        if !var_name.is_empty() {
            if expr::is_valid_variable(var_name, self.max_name_len()) {
                let idx = self.variable_index(var_name);
                self.emit(opcode::LOAD, idx);
                self.emit(opcode::PRINT_NUM, 0);
            } else {
                self.error(format!("Invalid variable name in print at line {line_number}"));
            }
            return;
        }

        let mut text = args;
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            text = &text[1..text.len() - 1];
        }
        let text = if self.validate_string(text) { text } else { "" };
        let idx = self.add_string(text);
        self.emit(opcode::PRINT, idx);
    }

    fn compile_led(&mut self, args: &str, line_number: usize) {
        let Some(space) = args.find(' ') else {
            self.warning(format!("Invalid LED command at line {line_number}"));
            return;
        };

        let pin: i64 = args[..space].parse().unwrap_or(0);
        let state = args[space + 1..].trim().to_lowercase();

        if !(0..=255).contains(&pin) {
            self.error(format!("Invalid pin number at line {line_number}"));
            return;
        }

        match state.as_str() {
            "on" | "1" | "true" => self.emit(opcode::LED_ON, pin as u32),
            "off" | "0" | "false" => self.emit(opcode::LED_OFF, pin as u32),
            _ => self.warning(format!("Unknown LED state at line {line_number}")),
        }
    }

    fn compile_delay(&mut self, args: &str, line_number: usize) {
        let mut ms: i64 = args.parse().unwrap_or(0);
        if !(0..=MAX_DELAY_MS).contains(&ms) {
            self.warning(format!("Delay time out of range at line {line_number}"));
            ms = ms.clamp(0, MAX_DELAY_MS);
        }
        self.emit(opcode::DELAY, ms as u32);
    }

    fn compile_push(&mut self, args: &str) {
        if expr::is_valid_variable(args, self.max_name_len()) {
            let idx = self.variable_index(args);
            self.emit(opcode::LOAD, idx);
        } else if expr::is_float(args) {
            self.emit_float(expr::parse_float(args));
        } else if expr::is_bool(args) {
            self.emit(opcode::PUSH_BOOL, (args == "true") as u32);
        } else if expr::is_quoted_string(args) {
            let inner = args[1..args.len() - 1].to_string();
            let inner = if self.validate_string(&inner) { inner } else { String::new() };
            let idx = self.add_string(&inner);
            self.emit(opcode::PUSH_STRING, idx);
        } else {
            self.emit(opcode::PUSH, expr::parse_int(args) as u32);
        }
    }

    fn compile_input(&mut self, args: &str, line_number: usize) {
        if !self.validate_variable_name(args) {
            self.error(format!("Invalid variable name for input at line {line_number}"));
            return;
        }
        let idx = self.variable_index(args);
        self.emit(opcode::INPUT, idx);
    }

    fn compile_set(&mut self, args: &str, line_number: usize) {
        let Some(space) = args.find(' ') else {
            self.error(format!("Invalid SET command at line {line_number}"));
            return;
        };
        let var_name = args[..space].to_string();
        let expression = args[space + 1..].to_string();

        if !self.validate_variable_name(&var_name) {
            self.error(format!(
                "Invalid variable name '{var_name}' at line {line_number}"
            ));
            return;
        }

        // Literal assignments fix the variable's type for later `endfor`
        // increment selection.
        if let Some(var_type) = literal_type(&expression) {
            self.variable_types.insert(var_name.clone(), var_type);
        }

        self.compile_expression(&expression);
        let idx = self.variable_index(&var_name);
        self.emit(opcode::STORE, idx);
    }

    fn compile_if(&mut self, args: &str, line_number: usize) {
        if self.if_stack.len() >= self.policy.max_if_depth() as usize {
            self.error(format!("IF nesting too deep at line {line_number}"));
            return;
        }

        match args.find(" then") {
            Some(pos) if pos > 0 => {
                let condition = args[..pos].to_string();
                self.compile_expression(&condition);
                let jump_addr = self.emitter.current_address();
                self.emit(opcode::JUMP_IF, 0);
                self.if_stack.push(jump_addr);
            }
            _ => self.error(format!("Invalid IF command at line {line_number}")),
        }
    }

    fn compile_else(&mut self, line_number: usize) {
        match self.if_stack.pop() {
            Some(if_jump_addr) => {
                let else_jump_addr = self.emitter.current_address();
                self.emit(opcode::JUMP, 0);
                // The taken branch jumps over the else-body's entry jump.
                let target = self.emitter.current_address() as u32;
                self.emitter.patch_arg1(if_jump_addr, target);
                self.if_stack.push(else_jump_addr);
            }
            None => self.error(format!("ELSE without IF at line {line_number}")),
        }
    }

    fn compile_endif(&mut self, line_number: usize) {
        match self.if_stack.pop() {
            Some(jump_addr) => {
                let target = self.emitter.current_address() as u32;
                self.emitter.patch_arg1(jump_addr, target);
            }
            None => self.error(format!("ENDIF without IF at line {line_number}")),
        }
    }

    fn compile_for(&mut self, args: &str, line_number: usize) {
        if self.loop_stack.len() >= self.policy.max_loop_depth() as usize {
            self.error(format!("Loop nesting too deep at line {line_number}"));
            return;
        }

        let equals = args.find('=');
        let to = args.find(" to ");
        let (Some(equals), Some(to)) = (equals, to) else {
            self.error(format!("Invalid FOR command at line {line_number}"));
            return;
        };
        if equals == 0 || to <= equals {
            self.error(format!("Invalid FOR command at line {line_number}"));
            return;
        }

        let var_name = args[..equals].trim().to_string();
        if !self.validate_variable_name(&var_name) {
            self.error(format!("Invalid variable name in FOR at line {line_number}"));
            return;
        }

        let start_expr = args[equals + 1..to].trim().to_string();
        let end_expr = args[to + 4..].trim().to_string();

        self.compile_expression(&start_expr);
        let var_index = self.variable_index(&var_name);
        self.emit(opcode::STORE, var_index);

        let start_address = self.emitter.current_address();
        self.emit(opcode::LOAD, var_index);
        self.compile_expression(&end_expr);
        self.emit(opcode::LTE, 0);

        let condition_address = self.emitter.current_address();
        self.emit(opcode::JUMP_IF, 0);

        self.loop_stack.push(LoopFrame {
            var_name,
            start_address,
            condition_address,
        });
    }

    fn compile_endfor(&mut self, line_number: usize) {
        match self.loop_stack.pop() {
            Some(frame) => {
                let var_index = self.variable_index(&frame.var_name);
                self.emit(opcode::LOAD, var_index);
                if self.variable_types.get(&frame.var_name) == Some(&VarType::Float) {
                    self.emit_float(1.0);
                } else {
                    self.emit(opcode::PUSH, 1);
                }
                self.emit(opcode::ADD, 0);
                self.emit(opcode::STORE, var_index);
                self.emit(opcode::JUMP, frame.start_address as u32);

                let target = self.emitter.current_address() as u32;
                self.emitter.patch_arg1(frame.condition_address, target);
            }
            None => self.error(format!("ENDFOR without FOR at line {line_number}")),
        }
    }

    fn compile_expression(&mut self, expression: &str) {
        if expression.is_empty() || expression.len() > expr::MAX_EXPRESSION_LENGTH {
            self.error("Invalid expression");
            return;
        }

        let processed = expr::rewrite_functions(
            expression,
            self.policy.max_expression_depth() as usize,
            &mut self.diagnostics,
        );
        let tokens = expr::tokenize(
            &processed,
            self.policy.max_string_length() as usize,
            &mut self.diagnostics,
        );
        let postfix = expr::infix_to_postfix(tokens, self.max_name_len(), &mut self.diagnostics);
        self.compile_postfix(postfix);
    }

    fn compile_postfix(&mut self, postfix: Vec<String>) {
        if postfix.len() > expr::MAX_EXPRESSION_TOKENS {
            self.error("Postfix expression too complex");
            return;
        }

        for token in postfix {
            if expr::is_integer(&token) {
                self.emit(opcode::PUSH, expr::parse_int(&token) as u32);
            } else if expr::is_float(&token) {
                self.emit_float(expr::parse_float(&token));
            } else if expr::is_bool(&token) {
                self.emit(opcode::PUSH_BOOL, (token == "true") as u32);
            } else if expr::is_quoted_string(&token) {
                let inner = token[1..token.len() - 1].to_string();
                let inner = if self.validate_string(&inner) { inner } else { String::new() };
                let idx = self.add_string(&inner);
                self.emit(opcode::PUSH_STRING, idx);
            } else if expr::is_valid_variable(&token, self.max_name_len()) {
                let idx = self.variable_index(&token);
                self.emit(opcode::LOAD, idx);
            } else if let Some(func) = expr::bracketed_function(&token) {
                self.compile_math_function(&token, func);
            } else if let Some(op) = operator_opcode(&token) {
                self.emit(op, 0);
            }
        }
    }

    fn compile_math_function(&mut self, token: &str, func: &'static expr::FunctionInfo) {
        let inner = &token[1..token.len() - 1];
        if func.num_args == 2 {
            match inner.find(',') {
                Some(comma) if comma > 0 => {
                    let first = inner[..comma].to_string();
                    let second = inner[comma + 1..].to_string();
                    self.compile_expression(&first);
                    self.compile_expression(&second);
                    self.emit(func.opcode, 0);
                }
                _ => self.error(format!("{} function requires two arguments", func.name)),
            }
        } else {
            let inner = inner.to_string();
            self.compile_expression(&inner);
            self.emit(func.opcode, 0);
        }
    }

    fn validate_string(&mut self, s: &str) -> bool {
        if s.len() > self.policy.max_string_length() as usize {
            self.error("String too long");
            return false;
        }
        true
    }

    fn validate_variable_name(&mut self, name: &str) -> bool {
        if name.len() > self.policy.max_variable_name_length() as usize {
            self.error("Variable name too long");
            return false;
        }
        if !expr::is_valid_variable(name, self.max_name_len()) {
            self.error("Invalid variable name");
            return false;
        }
        true
    }

    fn add_string(&mut self, s: &str) -> u32 {
        if !self.validate_string(s) {
            return 0;
        }
        match self.strings.intern(s) {
            Some(i) => i as u32,
            None => {
                self.error("String table overflow");
                0
            }
        }
    }

    fn variable_index(&mut self, name: &str) -> u32 {
        if self.validate_variable_name(name) {
            self.add_string(name)
        } else {
            0
        }
    }

    fn emit(&mut self, op: u8, arg1: u32) {
        if !self.emitter.emit(Instruction::new(op, arg1)) {
            self.error("Program too large");
        }
    }

    fn emit_float(&mut self, value: f32) {
        if !self.emitter.emit(Instruction::with_float(opcode::PUSH_FLOAT, value)) {
            self.error("Program too large");
        }
    }

    fn max_name_len(&self) -> usize {
        self.policy.max_variable_name_length() as usize
    }

    fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(message));
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(message));
    }
}

/// Strips a `//` comment and surrounding whitespace.
fn clean_line(line: &str) -> &str {
    let without_comment = match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    };
    without_comment.trim()
}

/// The type of a literal `set` argument, used for loop increment selection.
fn literal_type(expression: &str) -> Option<VarType> {
    if expr::is_quoted_string(expression) {
        Some(VarType::Str)
    } else if expr::is_float(expression) {
        Some(VarType::Float)
    } else if expr::is_integer(expression) {
        Some(VarType::Int)
    } else if expr::is_bool(expression) {
        Some(VarType::Bool)
    } else {
        None
    }
}

fn operator_opcode(token: &str) -> Option<u8> {
    let op = match token {
        "+" => opcode::ADD,
        "-" => opcode::SUB,
        "*" => opcode::MUL,
        "/" => opcode::DIV,
        "%" => opcode::MOD,
        "^" => opcode::POW,
        "==" => opcode::EQ,
        "!=" => opcode::NEQ,
        "<" => opcode::LT,
        ">" => opcode::GT,
        "<=" => opcode::LTE,
        ">=" => opcode::GTE,
        _ => return None,
    };
    Some(op)
}
