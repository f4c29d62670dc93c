//! The VM's I/O seams: text output, pin writes, and timed line input.
//!
//! All three are injected into the VM so that hosts wire real devices and
//! tests supply deterministic stubs.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Receives every line of program output and every diagnostic.
pub trait TextSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Writes to standard output with a flush per line.
#[derive(Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink
    }
}

impl TextSink for StdoutSink {
    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

/// Collects lines in memory; the deterministic sink used by tests.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l == needle)
    }
}

impl TextSink for MemorySink {
    fn line(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}

/// Capability-checked sink for digital output pins.
pub trait PinBackend: Send + Sync {
    fn pin_mode_output(&self, pin: u8);
    fn set_pin(&self, pin: u8, high: bool);
}

/// Discards pin writes; the desktop host has no pins.
#[derive(Default)]
pub struct NullPins;

impl NullPins {
    pub fn new() -> Self {
        NullPins
    }
}

impl PinBackend for NullPins {
    fn pin_mode_output(&self, _pin: u8) {}
    fn set_pin(&self, _pin: u8, _high: bool) {}
}

#[derive(Default)]
struct InputState {
    lines: VecDeque<String>,
    interrupted: bool,
}

/// Thread-safe queue of host-entered input lines with timed blocking reads.
///
/// The host pushes lines (trailing CR/LF stripped); the VM's INPUT opcode
/// performs a timed wait. `interrupt` wakes a blocked reader so `stop` does
/// not have to wait out the timeout.
#[derive(Default)]
pub struct InputQueue {
    state: Mutex<InputState>,
    ready: Condvar,
}

impl InputQueue {
    pub fn new() -> Self {
        InputQueue::default()
    }

    /// Enqueues one line, stripping trailing `\r` and `\n`.
    pub fn push_line(&self, line: &str) {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.lines.push_back(trimmed.to_string());
        self.ready.notify_one();
    }

    /// Blocks up to `timeout` for a line. Returns `None` on timeout or
    /// when interrupted.
    pub fn read_timeout(&self, timeout: Duration) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| {
                s.lines.is_empty() && !s.interrupted
            })
            .unwrap_or_else(PoisonError::into_inner);
        if state.interrupted {
            return None;
        }
        state.lines.pop_front()
    }

    /// Wakes a blocked reader; it observes the interruption and returns
    /// empty-handed. The flag persists until [`InputQueue::reset`].
    pub fn interrupt(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.interrupted = true;
        self.ready.notify_all();
    }

    /// Clears the interrupted flag; queued lines are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.interrupted = false;
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
