//! Shared fixtures for VM integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use xeno_container::{Instruction, Program, StringTable};
use xeno_security::SecurityConfig;
use xeno_vm::{InputQueue, MemorySink, PinBackend, TextSink, Vm};

/// Records pin writes for assertions.
#[derive(Default)]
pub struct RecordingPins {
    writes: Mutex<Vec<(u8, bool)>>,
}

impl RecordingPins {
    pub fn new() -> Self {
        RecordingPins::default()
    }

    #[allow(dead_code)]
    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PinBackend for RecordingPins {
    fn pin_mode_output(&self, _pin: u8) {}

    fn set_pin(&self, pin: u8, high: bool) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pin, high));
    }
}

#[allow(dead_code)]
pub struct VmFixture {
    pub sink: Arc<MemorySink>,
    pub pins: Arc<RecordingPins>,
    pub input: Arc<InputQueue>,
    pub vm: Vm,
}

pub fn fixture() -> VmFixture {
    let sink = Arc::new(MemorySink::new());
    let pins = Arc::new(RecordingPins::new());
    let input = Arc::new(InputQueue::new());
    let vm = Vm::new(
        Arc::clone(&sink) as Arc<dyn TextSink>,
        Arc::clone(&pins) as Arc<dyn PinBackend>,
        Arc::clone(&input),
    );
    VmFixture {
        sink,
        pins,
        input,
        vm,
    }
}

/// Loads hand-built bytecode under the default policy.
#[allow(dead_code)]
pub fn load(vm: &mut Vm, code: Vec<Instruction>, strings: &[&str]) -> bool {
    load_with(vm, code, strings, SecurityConfig::default())
}

#[allow(dead_code)]
pub fn load_with(
    vm: &mut Vm,
    code: Vec<Instruction>,
    strings: &[&str],
    policy: SecurityConfig,
) -> bool {
    let program = Program {
        code,
        strings: StringTable::from_entries(strings.iter().map(|s| s.to_string()).collect()),
    };
    vm.load_program(&program, policy)
}

/// Sink contents minus the load confirmation line.
#[allow(dead_code)]
pub fn output(sink: &MemorySink) -> Vec<String> {
    sink.lines()
        .into_iter()
        .filter(|l| l != "Program loaded and verified successfully")
        .collect()
}
