//! Register/memory virtual machine
//!
//! This module contains the VM that executes integer programs: a growable
//! memory, the instruction decoder, the executor and the run loop, plus the
//! channels hosts use to talk to a running VM.

mod channel;
mod decoder;
mod disasm;
mod errors;
mod execution;
mod memory;
mod types;

pub use channel::Channel;
pub use decoder::decode;
pub use disasm::{disassemble, Line};
pub use errors::VMError;
pub use execution::{Step, VMExecution};
pub use memory::VMMemory;
pub use types::{CancellationToken, Instruction, Mode, Opcode, Param, VMStatus};

// Main VM struct that coordinates components
mod vm;
pub use vm::{AsciiOutput, VM};
