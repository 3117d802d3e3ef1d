//! Error types for VM operations
//!
//! This module defines the fatal conditions that can stop a `run` call.
//! Waiting for input is not an error; it is reported through `VMStatus`.

use thiserror::Error;

/// Error variants that can occur during VM execution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    /// The low two digits of an instruction word do not name an opcode
    #[error("Unknown opcode {opcode} at address {address}")]
    UnknownOpcode { opcode: i64, address: usize },

    /// A parameter mode digit is not 0, 1 or 2
    #[error("Unknown parameter mode {mode} at address {address}")]
    UnknownMode { mode: i64, address: usize },

    /// A read, write or jump resolved to a negative address
    #[error("Invalid address: {0}")]
    InvalidAddress(i64),

    /// An immediate-mode parameter was used as a write destination
    #[error("Illegal write target (immediate mode) in instruction at address {address}")]
    IllegalWriteTarget { address: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = VMError::UnknownOpcode {
            opcode: 42,
            address: 7,
        };
        assert_eq!(err.to_string(), "Unknown opcode 42 at address 7");

        let err = VMError::InvalidAddress(-3);
        assert_eq!(err.to_string(), "Invalid address: -3");
    }
}
