//! Error types for bridge operations.

use thiserror::Error;

/// Errors that can abort an import or export operation.
///
/// Soft query failures (a reply containing an error marker, or `false`, or
/// blank) are *not* represented here: the protocol layer recovers from them
/// locally by treating them as "no data". Only transport- and I/O-level
/// failures surface as `BridgeError`.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// IO error while reading or writing a Modelica document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The compiler service refused or failed a command outright
    /// (e.g. `loadFile` returned `false`).
    #[error("compiler rejected `{command}`: {message}")]
    Compiler { command: String, message: String },
}

impl BridgeError {
    /// Create a compiler-rejection error.
    pub fn compiler(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compiler {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;
