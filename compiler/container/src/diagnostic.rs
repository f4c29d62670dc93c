use std::fmt;

/// Diagnostic categories, in increasing order of consequence.
///
/// Warnings never fail a compile; security diagnostics come from the policy
/// or the verifier; critical diagnostics accompany fatal VM stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Security,
    Critical,
}

impl Severity {
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Security => "SECURITY",
            Severity::Critical => "CRITICAL ERROR",
        }
    }
}

/// A single-line diagnostic in the wire format the host understands:
/// `<PREFIX>: <message>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Security,
            message: message.into(),
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Critical,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.prefix(), self.message)
    }
}
