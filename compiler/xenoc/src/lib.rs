//! Host front-end for the Xeno toolchain.
//!
//! [`Runtime`] is the embedding facade: it owns the security policy, the
//! last compilation, and the VM. [`Bridge`] exposes the line-oriented
//! command protocol over any buffered reader, with responses and program
//! output sharing one text sink.

pub mod bridge;
pub mod info;
pub mod logger;
pub mod runtime;

pub use bridge::Bridge;
pub use runtime::Runtime;

pub const LANGUAGE_NAME: &str = "Xeno Language";
pub const LANGUAGE_VERSION: &str = "v0.1.3";
pub const LANGUAGE_DATE: &str = "08.11.2025";

pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BRIDGE_DATE: &str = "08.11.2025";
