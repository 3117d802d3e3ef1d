//! Type definitions for the virtual machine
//!
//! This module contains the core data types used by the VM: opcodes,
//! parameter modes, decoded instructions, run status and the cooperative
//! cancellation token.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operations understood by the VM
///
/// The discriminant is the two-digit code found in the low digits of an
/// instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// `dst := a + b`
    Add,
    /// `dst := a * b`
    Mul,
    /// Read one value from the input channel into `dst`
    Input,
    /// Write `a` to the output channel
    Output,
    /// Jump to `b` if `a != 0`
    JumpIfTrue,
    /// Jump to `b` if `a == 0`
    JumpIfFalse,
    /// `dst := (a < b) as i64`
    LessThan,
    /// `dst := (a == b) as i64`
    Equals,
    /// `relative_base += a`
    AdjustRelativeBase,
    /// Stop execution
    Halt,
}

impl Opcode {
    /// Decode the two-digit opcode value
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Add),
            2 => Some(Self::Mul),
            3 => Some(Self::Input),
            4 => Some(Self::Output),
            5 => Some(Self::JumpIfTrue),
            6 => Some(Self::JumpIfFalse),
            7 => Some(Self::LessThan),
            8 => Some(Self::Equals),
            9 => Some(Self::AdjustRelativeBase),
            99 => Some(Self::Halt),
            _ => None,
        }
    }

    /// The two-digit code of this opcode
    pub fn code(self) -> i64 {
        match self {
            Self::Add => 1,
            Self::Mul => 2,
            Self::Input => 3,
            Self::Output => 4,
            Self::JumpIfTrue => 5,
            Self::JumpIfFalse => 6,
            Self::LessThan => 7,
            Self::Equals => 8,
            Self::AdjustRelativeBase => 9,
            Self::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word
    pub fn param_count(self) -> usize {
        match self {
            Self::Add | Self::Mul | Self::LessThan | Self::Equals => 3,
            Self::JumpIfTrue | Self::JumpIfFalse => 2,
            Self::Input | Self::Output | Self::AdjustRelativeBase => 1,
            Self::Halt => 0,
        }
    }

    /// Short mnemonic used by the disassembler
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Mul => "MUL",
            Self::Input => "IN",
            Self::Output => "OUT",
            Self::JumpIfTrue => "JNZ",
            Self::JumpIfFalse => "JZ",
            Self::LessThan => "LT",
            Self::Equals => "EQ",
            Self::AdjustRelativeBase => "ARB",
            Self::Halt => "HALT",
        }
    }

    /// Whether the last parameter is a write destination
    pub fn writes_last_param(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Mul | Self::Input | Self::LessThan | Self::Equals
        )
    }
}

/// Addressing mode of a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The parameter is an absolute address
    Position,
    /// The parameter is the operand itself
    Immediate,
    /// The parameter is an offset from the relative base
    Relative,
}

impl Mode {
    /// Decode a single mode digit
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Self::Position),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }
}

/// A raw parameter value tagged with its addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub value: i64,
    pub mode: Mode,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Position => write!(f, "[{}]", self.value),
            Mode::Immediate => write!(f, "#{}", self.value),
            Mode::Relative if self.value < 0 => write!(f, "[rb{}]", self.value),
            Mode::Relative => write!(f, "[rb+{}]", self.value),
        }
    }
}

/// A fully decoded instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Address of the instruction word
    pub address: usize,
    pub opcode: Opcode,
    pub params: Vec<Param>,
}

impl Instruction {
    /// Number of memory cells the instruction occupies
    pub fn width(&self) -> usize {
        1 + self.params.len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        let count = self.params.len();
        for (i, param) in self.params.iter().enumerate() {
            if i + 1 == count && self.opcode.writes_last_param() && count > 1 {
                write!(f, " -> {}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}

/// Lifecycle status reported by a `run` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VMStatus {
    /// Loaded (or resumed) and not yet suspended
    Running,
    /// Suspended at an input instruction with an empty input channel
    AwaitingInput,
    /// Executed a halt instruction
    Halted,
    /// Stopped early because the cancellation token was set
    Cancelled,
}

impl fmt::Display for VMStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::AwaitingInput => "awaiting input",
            Self::Halted => "halted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation signal shared between a runner and its controller
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next instruction or tick boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_codes_round_trip() {
        for code in [1, 2, 3, 4, 5, 6, 7, 8, 9, 99] {
            let opcode = Opcode::from_code(code).unwrap();
            assert_eq!(opcode.code(), code);
        }
        assert_eq!(Opcode::from_code(10), None);
        assert_eq!(Opcode::from_code(0), None);
    }

    #[test]
    fn test_instruction_display() {
        let instruction = Instruction {
            address: 0,
            opcode: Opcode::Add,
            params: vec![
                Param { value: 9, mode: Mode::Position },
                Param { value: 3, mode: Mode::Immediate },
                Param { value: -1, mode: Mode::Relative },
            ],
        };
        assert_eq!(instruction.to_string(), "ADD [9] #3 -> [rb-1]");
        assert_eq!(instruction.width(), 4);
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
