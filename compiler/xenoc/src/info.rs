//! Startup metadata file for IDE integrations.
//!
//! `xeno_info.txt` carries the language/compiler/VM/bridge versions and an
//! `[API_SETTINGS]` section listing one `SUPPORT_<COMMAND>` capability
//! token per bridge command.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const INFO_FILE_NAME: &str = "xeno_info.txt";

/// Every command the bridge understands, in protocol spelling.
pub const SUPPORTED_COMMANDS: &[&str] = &[
    "COMPILE",
    "RUN",
    "STOP",
    "STEP",
    "IS_RUNNING",
    "DUMP_STATE",
    "DISASSEMBLE",
    "PRINT_COMPILED_CODE",
    "SET_MAX_INSTRUCTIONS",
    "SET_MAX_STRING_LIMIT",
    "SET_MAX_VARIABLE_NAME_LIMIT",
    "SET_MAX_EXPRESSION_DEPTH",
    "SET_MAX_LOOP_DEPTH",
    "SET_MAX_IF_DEPTH",
    "SET_MAX_STACK_SIZE",
    "SET_ALLOWED_PINS",
    "GET_LANGUAGE_NAME",
    "GET_LANGUAGE_VERSION",
    "GET_LANGUAGE_DATE",
    "GET_VM_VERSION",
    "GET_VM_DATE",
    "GET_COMPILER_VERSION",
    "GET_COMPILER_DATE",
    "GET_BRIDGE_VERSION",
    "GET_BRIDGE_DATE",
    "GET_VERSION",
    "GET_SETTINGS",
    "GET_SECURITY_LIMITS",
    "STDIN",
    "EXIT",
];

/// Writes `xeno_info.txt` into `dir` and returns its path.
pub fn write_info_file(dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(INFO_FILE_NAME);
    let mut file = File::create(&path)?;

    writeln!(file, "Language: {}", crate::LANGUAGE_NAME)?;
    writeln!(file, "LanguageVersion: {}", crate::LANGUAGE_VERSION)?;
    writeln!(file, "LanguageDate: {}", crate::LANGUAGE_DATE)?;
    writeln!(file, "VMVersion: {}", xeno_vm::VM_VERSION)?;
    writeln!(file, "VMDate: {}", xeno_vm::VM_DATE)?;
    writeln!(file, "CompilerVersion: {}", xeno_codegen::COMPILER_VERSION)?;
    writeln!(file, "CompilerDate: {}", xeno_codegen::COMPILER_DATE)?;
    writeln!(file, "BridgeVersion: {}", crate::BRIDGE_VERSION)?;
    writeln!(file, "BridgeDate: {}", crate::BRIDGE_DATE)?;
    writeln!(file, "[API_SETTINGS]")?;
    for command in SUPPORTED_COMMANDS {
        writeln!(file, "SUPPORT_{command}")?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_file_when_written_then_has_versions_and_capabilities() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_info_file(dir.path()).expect("write info file");

        let content = std::fs::read_to_string(path).expect("read info file");
        assert!(content.contains("Language: Xeno Language"));
        assert!(content.contains("LanguageVersion: v0.1.3"));
        assert!(content.contains("VMVersion: v0.1.3"));
        assert!(content.contains("[API_SETTINGS]"));
        assert!(content.contains("SUPPORT_COMPILE"));
        assert!(content.contains("SUPPORT_STDIN"));
        assert!(content.contains("SUPPORT_EXIT"));
    }

    #[test]
    fn info_file_when_sections_ordered_then_settings_after_versions() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_info_file(dir.path()).expect("write info file");

        let content = std::fs::read_to_string(path).expect("read info file");
        let settings_at = content.find("[API_SETTINGS]").expect("settings section");
        let bridge_at = content.find("BridgeVersion:").expect("bridge line");
        assert!(bridge_at < settings_at);
    }
}
