//! The host text command protocol.
//!
//! Line-oriented over any buffered reader; each response is a single line
//! through the shared text sink, which flushes per line in production.
//! RUN executes on a worker thread so STOP and IS_RUNNING stay responsive
//! while a program runs; STOP reaches a busy VM through its [`StopHandle`].

use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread::JoinHandle;

use xeno_security::ConfigError;
use xeno_vm::{InputQueue, StopHandle, TextSink};

use crate::runtime::Runtime;

enum Flow {
    Continue,
    Exit,
}

pub struct Bridge<R: BufRead> {
    reader: R,
    engine: Arc<Mutex<Runtime>>,
    sink: Arc<dyn TextSink>,
    input: Arc<InputQueue>,
    stop: StopHandle,
    worker: Option<JoinHandle<()>>,
}

impl<R: BufRead> Bridge<R> {
    pub fn new(
        reader: R,
        engine: Arc<Mutex<Runtime>>,
        sink: Arc<dyn TextSink>,
        input: Arc<InputQueue>,
    ) -> Self {
        let stop = engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_handle();
        Bridge {
            reader,
            engine,
            sink,
            input,
            stop,
            worker: None,
        }
    }

    /// Reads commands until EXIT or end of input.
    pub fn serve(&mut self) {
        while let Some(line) = self.read_line() {
            let command = line.trim_end_matches(['\r', '\n']).to_string();
            if let Flow::Exit = self.handle_command(&command) {
                break;
            }
        }
    }

    fn handle_command(&mut self, command: &str) -> Flow {
        if let Some(payload) = command.strip_prefix("STDIN ") {
            self.input.push_line(payload);
            return Flow::Continue;
        }

        match command {
            "COMPILE" => self.cmd_compile(),
            "RUN" => self.cmd_run(),
            "STOP" => self.cmd_stop(),
            "STEP" => {
                self.with_engine(|rt| {
                    rt.step();
                });
            }
            "IS_RUNNING" => self.cmd_is_running(),
            "DUMP_STATE" => self.with_engine(|rt| rt.dump_state()),
            "DISASSEMBLE" => self.with_engine(|rt| rt.disassemble()),
            "PRINT_COMPILED_CODE" => self.with_engine(|rt| rt.print_compiled_code()),
            "SET_MAX_INSTRUCTIONS" => self.cmd_set_u32("max instructions", |rt, v| {
                rt.set_max_instructions(v)
            }),
            "SET_MAX_STRING_LIMIT" => self.cmd_set_u16("max string length", |rt, v| {
                rt.set_max_string_length(v)
            }),
            "SET_MAX_VARIABLE_NAME_LIMIT" => {
                self.cmd_set_u16("max variable name length", |rt, v| {
                    rt.set_max_variable_name_length(v)
                })
            }
            "SET_MAX_EXPRESSION_DEPTH" => self.cmd_set_u16("max expression depth", |rt, v| {
                rt.set_max_expression_depth(v)
            }),
            "SET_MAX_LOOP_DEPTH" => {
                self.cmd_set_u16("max loop depth", |rt, v| rt.set_max_loop_depth(v))
            }
            "SET_MAX_IF_DEPTH" => {
                self.cmd_set_u16("max if depth", |rt, v| rt.set_max_if_depth(v))
            }
            "SET_MAX_STACK_SIZE" => {
                self.cmd_set_u16("max stack size", |rt, v| rt.set_max_stack_size(v))
            }
            "SET_ALLOWED_PINS" => self.cmd_set_allowed_pins(),
            "GET_LANGUAGE_NAME" => {
                self.sink.line(&format!("Language: {}", crate::LANGUAGE_NAME));
            }
            "GET_LANGUAGE_VERSION" => {
                self.sink
                    .line(&format!("Language version: {}", crate::LANGUAGE_VERSION));
            }
            "GET_LANGUAGE_DATE" => {
                self.sink
                    .line(&format!("Language date: {}", crate::LANGUAGE_DATE));
            }
            "GET_VM_VERSION" => {
                self.sink.line(&format!("VM version: {}", xeno_vm::VM_VERSION));
            }
            "GET_VM_DATE" => {
                self.sink.line(&format!("VM date: {}", xeno_vm::VM_DATE));
            }
            "GET_COMPILER_VERSION" => {
                self.sink.line(&format!(
                    "Compiler version: {}",
                    xeno_codegen::COMPILER_VERSION
                ));
            }
            "GET_COMPILER_DATE" => {
                self.sink
                    .line(&format!("Compiler date: {}", xeno_codegen::COMPILER_DATE));
            }
            "GET_BRIDGE_VERSION" => {
                self.sink
                    .line(&format!("Bridge version: {}", crate::BRIDGE_VERSION));
            }
            "GET_BRIDGE_DATE" => {
                self.sink.line(&format!("Bridge date: {}", crate::BRIDGE_DATE));
            }
            "GET_VERSION" => {
                if let Some(info) = self.with_engine_value(|rt| rt.version_info()) {
                    self.emit_block(&info);
                }
            }
            "GET_SETTINGS" => {
                if let Some(info) = self.with_engine_value(|rt| rt.settings_info()) {
                    self.emit_block(&info);
                }
            }
            "GET_SECURITY_LIMITS" => {
                if let Some(info) = self.with_engine_value(|rt| rt.security_limits_info()) {
                    self.emit_block(&info);
                }
            }
            "EXIT" => {
                self.sink.line("Exiting");
                return Flow::Exit;
            }
            other => {
                self.sink.line(&format!("Unknown command: {other}"));
            }
        }
        Flow::Continue
    }

    /// COMPILE framing: one line with the decimal byte length, then exactly
    /// that many bytes of source; a trailing newline after the blob is
    /// consumed when present.
    fn cmd_compile(&mut self) {
        let Some(len_line) = self.read_line() else {
            self.sink.line("Missing source code length");
            return;
        };
        let Ok(length) = len_line.trim().parse::<usize>() else {
            self.sink.line("Invalid length format");
            return;
        };

        let mut buf = vec![0u8; length];
        if self.reader.read_exact(&mut buf).is_err() {
            self.sink.line("Could not read source code");
            return;
        }
        if let Ok(pending) = self.reader.fill_buf() {
            if pending.first() == Some(&b'\n') {
                self.reader.consume(1);
            }
        }

        let source = match String::from_utf8(buf) {
            Ok(s) => s,
            Err(_) => {
                self.sink
                    .line("Compilation error: source is not valid UTF-8");
                return;
            }
        };

        match self.with_engine_value(|rt| rt.compile(&source)) {
            Some(true) => self.sink.line("Compilation successful!"),
            Some(false) => self
                .sink
                .line("Compilation failed - check your code for errors"),
            None => {}
        }
    }

    fn cmd_run(&mut self) {
        if self.worker.as_ref().is_some_and(|h| !h.is_finished()) {
            self.sink.line("VM already running");
            return;
        }
        if let Some(finished) = self.worker.take() {
            let _ = finished.join();
        }

        let engine = Arc::clone(&self.engine);
        let sink = Arc::clone(&self.sink);
        self.worker = Some(std::thread::spawn(move || {
            let mut rt = engine.lock().unwrap_or_else(PoisonError::into_inner);
            if rt.run(true) {
                sink.line("=== Execution completed ===");
            } else {
                sink.line("Failed to start virtual machine");
            }
        }));
    }

    fn cmd_stop(&mut self) {
        match self.engine.try_lock() {
            Ok(mut rt) => rt.stop(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().stop(),
            // The worker holds the lock; reach the VM through its handle.
            Err(TryLockError::WouldBlock) => self.stop.request_stop(),
        }
        self.sink.line("Virtual machine stopped");
    }

    fn cmd_is_running(&mut self) {
        let running = if self.worker.as_ref().is_some_and(|h| !h.is_finished()) {
            true
        } else {
            match self.engine.try_lock() {
                Ok(rt) => rt.is_running(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_running(),
                Err(TryLockError::WouldBlock) => true,
            }
        };
        self.sink
            .line(if running { "VM is running" } else { "VM is not running" });
    }

    fn cmd_set_u16(
        &mut self,
        name: &str,
        apply: fn(&mut Runtime, u16) -> Result<(), ConfigError>,
    ) {
        let Some(line) = self.read_line() else {
            self.sink.line(&format!("Missing value for {name}"));
            return;
        };
        let Ok(value) = line.trim().parse::<u16>() else {
            self.sink.line(&format!("Invalid value for {name}"));
            return;
        };
        if let Some(Err(err)) = self.with_engine_value(|rt| apply(rt, value)) {
            self.sink.line(&err.to_string());
        }
    }

    fn cmd_set_u32(
        &mut self,
        name: &str,
        apply: fn(&mut Runtime, u32) -> Result<(), ConfigError>,
    ) {
        let Some(line) = self.read_line() else {
            self.sink.line(&format!("Missing value for {name}"));
            return;
        };
        let Ok(value) = line.trim().parse::<u32>() else {
            self.sink.line(&format!("Invalid value for {name}"));
            return;
        };
        if let Some(Err(err)) = self.with_engine_value(|rt| apply(rt, value)) {
            self.sink.line(&err.to_string());
        }
    }

    fn cmd_set_allowed_pins(&mut self) {
        let Some(line) = self.read_line() else {
            self.sink.line("Missing value for allowed pins");
            return;
        };
        let mut pins = Vec::new();
        for part in line.trim().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.parse::<u16>() {
                Ok(pin) => pins.push(pin),
                Err(_) => {
                    self.sink.line("Invalid value for allowed pins");
                    return;
                }
            }
        }
        if let Some(Err(err)) = self.with_engine_value(|rt| rt.set_allowed_pins(&pins)) {
            self.sink.line(&err.to_string());
        }
    }

    fn with_engine(&mut self, f: impl FnOnce(&mut Runtime)) {
        let _ = self.with_engine_value(f);
    }

    /// Runs a closure under the engine lock; while a program runs, the
    /// worker holds the lock and the command is refused.
    fn with_engine_value<T>(&mut self, f: impl FnOnce(&mut Runtime) -> T) -> Option<T> {
        match self.engine.try_lock() {
            Ok(mut rt) => Some(f(&mut rt)),
            Err(TryLockError::Poisoned(poisoned)) => Some(f(&mut poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => {
                self.sink.line("VM is running");
                None
            }
        }
    }

    fn emit_block(&self, text: &str) {
        for line in text.split('\n') {
            self.sink.line(line);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }

    /// Waits for an in-flight RUN worker to finish. Test-facing; the
    /// interactive loop never blocks on the worker.
    pub fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
