//! The embedding facade: one instance per language runtime.

use std::sync::Arc;

use log::debug;

use xeno_codegen::Compilation;
use xeno_container::disasm;
use xeno_security::{ConfigError, SecurityConfig};
use xeno_vm::{InputQueue, PinBackend, StopHandle, TextSink, Vm};

/// Owns the security policy, the last compilation, and the VM.
///
/// The policy has exactly one owner; the compiler reads it by reference and
/// the VM snapshots it at load time, so setters between runs never disturb
/// an execution in flight.
pub struct Runtime {
    policy: SecurityConfig,
    compilation: Option<Compilation>,
    vm: Vm,
    sink: Arc<dyn TextSink>,
}

impl Runtime {
    pub fn new(
        sink: Arc<dyn TextSink>,
        pins: Arc<dyn PinBackend>,
        input: Arc<InputQueue>,
    ) -> Self {
        Runtime {
            policy: SecurityConfig::default(),
            compilation: None,
            vm: Vm::new(Arc::clone(&sink), pins, input),
            sink,
        }
    }

    /// Compiles source text, routing diagnostics to the text sink.
    /// Succeeds when no error-severity diagnostic was produced.
    pub fn compile(&mut self, source: &str) -> bool {
        let compilation = xeno_codegen::compile(source, &self.policy);
        for diagnostic in &compilation.diagnostics {
            self.sink.line(&diagnostic.to_string());
        }
        let ok = compilation.is_ok();
        debug!(
            "compiled {} instructions, ok={ok}",
            compilation.program.len()
        );
        self.compilation = Some(compilation);
        ok
    }

    /// Loads the last-compiled program into the VM and runs it to
    /// completion or fatal error. Fails when verification rejects the load.
    pub fn run(&mut self, quiet: bool) -> bool {
        let program = self
            .compilation
            .as_ref()
            .map(|c| c.program.clone())
            .unwrap_or_default();
        if !self.vm.load_program(&program, self.policy.clone()) {
            return false;
        }
        self.vm.run(quiet);
        true
    }

    pub fn compile_and_run(&mut self, source: &str, quiet: bool) -> bool {
        if !self.compile(source) {
            return false;
        }
        self.run(quiet)
    }

    pub fn step(&mut self) -> bool {
        self.vm.step()
    }

    pub fn stop(&mut self) {
        self.vm.stop();
    }

    pub fn is_running(&self) -> bool {
        self.vm.is_running()
    }

    /// A handle for stopping a run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.vm.stop_handle()
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    pub fn dump_state(&self) {
        self.vm.dump_state();
    }

    pub fn disassemble(&self) {
        self.vm.disassemble();
    }

    /// Writes the compiler's output (string table, then bytecode) to the
    /// text sink.
    pub fn print_compiled_code(&self) {
        self.sink.line("=== Compiled Xeno Program ===");
        self.sink.line("String table:");
        if let Some(compilation) = &self.compilation {
            for (i, entry) in compilation.program.strings.entries().iter().enumerate() {
                self.sink.line(&format!("  {i}: \"{entry}\""));
            }
        }
        self.sink.line("Bytecode:");
        if let Some(compilation) = &self.compilation {
            for line in
                disasm::render_listing(&compilation.program.code, &compilation.program.strings)
            {
                self.sink.line(&format!("  {line}"));
            }
        }
    }

    pub fn policy(&self) -> &SecurityConfig {
        &self.policy
    }

    pub fn set_max_string_length(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_string_length(value)
    }

    pub fn set_max_variable_name_length(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_variable_name_length(value)
    }

    pub fn set_max_expression_depth(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_expression_depth(value)
    }

    pub fn set_max_loop_depth(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_loop_depth(value)
    }

    pub fn set_max_if_depth(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_if_depth(value)
    }

    pub fn set_max_stack_size(&mut self, value: u16) -> Result<(), ConfigError> {
        self.policy.set_max_stack_size(value)
    }

    pub fn set_max_instructions(&mut self, value: u32) -> Result<(), ConfigError> {
        self.policy.set_max_instructions(value)
    }

    pub fn set_allowed_pins(&mut self, pins: &[u16]) -> Result<(), ConfigError> {
        self.policy.set_allowed_pins(pins)
    }

    pub fn security_limits_info(&self) -> String {
        self.policy.security_limits_info()
    }

    /// A multi-line summary of the current policy values.
    pub fn settings_info(&self) -> String {
        format!(
            "Current Settings:\n\
             \x20 Max Instructions: {}\n\
             \x20 Max String Length: {}\n\
             \x20 Max Variable Name Length: {}\n\
             \x20 Max Expression Depth: {}\n\
             \x20 Max Loop Depth: {}\n\
             \x20 Max If Depth: {}\n\
             \x20 Max Stack Size: {}\n\
             \x20 Allowed Pins: {}",
            self.policy.max_instructions(),
            self.policy.max_string_length(),
            self.policy.max_variable_name_length(),
            self.policy.max_expression_depth(),
            self.policy.max_loop_depth(),
            self.policy.max_if_depth(),
            self.policy.max_stack_size(),
            self.policy
                .allowed_pins()
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// The multi-line version summary served by GET_VERSION.
    pub fn version_info(&self) -> String {
        format!(
            "Version Information:\n\
             \x20 Language: {} {} ({})\n\
             \x20 Virtual Machine: {} ({})\n\
             \x20 Compiler: {} ({})",
            crate::LANGUAGE_NAME,
            crate::LANGUAGE_VERSION,
            crate::LANGUAGE_DATE,
            xeno_vm::VM_VERSION,
            xeno_vm::VM_DATE,
            xeno_codegen::COMPILER_VERSION,
            xeno_codegen::COMPILER_DATE,
        )
    }
}
