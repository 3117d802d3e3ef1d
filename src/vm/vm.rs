//! Main Virtual Machine implementation
//!
//! This module brings together memory, decoding and execution to implement
//! the fetch-decode-execute loop.
//!
//! The VM struct is the central coordinator that:
//! - Owns memory, the control registers and the two I/O channels
//! - Runs until it halts, needs input, or observes cancellation
//! - Provides the host surface for wiring, patching and inspection
//!
//! The only suspension point is an input instruction with an empty input
//! channel. A later `run` re-attempts that same instruction, so a VM behaves
//! like a coroutine that yields whenever it is starved of input.

use log::debug;

use crate::vm::channel::Channel;
use crate::vm::decoder::decode;
use crate::vm::errors::VMError;
use crate::vm::execution::{Step, VMExecution};
use crate::vm::memory::VMMemory;
use crate::vm::types::{CancellationToken, VMStatus};

/// Output split into printable ASCII text and the values that are not ASCII
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsciiOutput {
    pub text: String,
    pub values: Vec<i64>,
}

/// The register/memory virtual machine
#[derive(Debug, Clone)]
pub struct VM {
    /// Program and data memory
    pub memory: VMMemory,

    /// Instruction pointer, relative base and instruction semantics
    pub executor: VMExecution,

    input: Channel,
    output: Channel,
    status: VMStatus,
    id: Option<i64>,
    steps: u64,
}

impl VM {
    /// Create a VM with `program` loaded at address 0
    pub fn new(program: &[i64]) -> Self {
        Self {
            memory: VMMemory::load(program),
            executor: VMExecution::new(),
            input: Channel::new(),
            output: Channel::new(),
            status: VMStatus::Running,
            id: None,
            steps: 0,
        }
    }

    /// Create a VM tagged with an identity for multi-instance use
    pub fn with_id(program: &[i64], id: i64) -> Self {
        let mut vm = Self::new(program);
        vm.id = Some(id);
        vm
    }

    /// Make `downstream` read from the queue `upstream` writes to
    pub fn link(upstream: &VM, downstream: &mut VM) {
        downstream.connect_input(upstream.output.clone());
    }

    /// Replace the input channel with another handle
    ///
    /// Anything queued on the previous input channel is left there.
    pub fn connect_input(&mut self, channel: Channel) {
        self.input = channel;
    }

    /// Run until halted or awaiting input
    pub fn run(&mut self) -> Result<VMStatus, VMError> {
        self.run_inner(None)
    }

    /// Run until halted, awaiting input, or `token` is cancelled
    ///
    /// The token is polled before every instruction. A cancelled VM keeps its
    /// state and may be resumed by another `run` call.
    pub fn run_with_cancel(&mut self, token: &CancellationToken) -> Result<VMStatus, VMError> {
        self.run_inner(Some(token))
    }

    fn run_inner(&mut self, token: Option<&CancellationToken>) -> Result<VMStatus, VMError> {
        if self.status == VMStatus::Halted {
            return Ok(VMStatus::Halted);
        }
        self.status = VMStatus::Running;

        loop {
            if token.map_or(false, CancellationToken::is_cancelled) {
                debug!("{}cancelled at ip {}", self.label(), self.executor.ip);
                self.status = VMStatus::Cancelled;
                return Ok(self.status);
            }

            let status = self.step()?;
            if status != VMStatus::Running {
                return Ok(status);
            }
        }
    }

    /// Execute exactly one instruction
    ///
    /// Returns `Running` if execution can continue, otherwise the status the
    /// VM is left in.
    pub fn step(&mut self) -> Result<VMStatus, VMError> {
        if self.status == VMStatus::Halted {
            return Ok(VMStatus::Halted);
        }

        let instruction = decode(&self.memory, self.executor.ip)?;
        let step = self
            .executor
            .execute(&instruction, &mut self.memory, &self.input, &self.output)?;

        self.status = match step {
            Step::Continue => {
                self.steps += 1;
                VMStatus::Running
            }
            Step::Suspend => {
                debug!("{}awaiting input at ip {}", self.label(), self.executor.ip);
                VMStatus::AwaitingInput
            }
            Step::Halt => {
                self.steps += 1;
                debug!("{}halted after {} steps", self.label(), self.steps);
                VMStatus::Halted
            }
        };
        Ok(self.status)
    }

    /// Queue a value on the input channel
    pub fn push_input(&self, value: i64) {
        self.input.push(value);
    }

    /// Queue a line of ASCII text, one value per byte
    pub fn push_ascii(&self, text: &str) {
        self.input.push_ascii(text);
    }

    /// Remove and return everything written to the output channel
    pub fn take_output(&self) -> Vec<i64> {
        self.output.drain()
    }

    /// Drain the output, decoding ASCII values as text
    pub fn take_ascii_output(&self) -> AsciiOutput {
        let mut decoded = AsciiOutput::default();
        for value in self.output.drain() {
            match u8::try_from(value) {
                Ok(byte) if byte.is_ascii() => decoded.text.push(char::from(byte)),
                _ => decoded.values.push(value),
            }
        }
        decoded
    }

    /// Handle to the input channel
    pub fn input(&self) -> &Channel {
        &self.input
    }

    /// Handle to the output channel
    pub fn output(&self) -> &Channel {
        &self.output
    }

    /// Read a memory cell
    pub fn read(&self, address: i64) -> Result<i64, VMError> {
        self.memory.read(address)
    }

    /// Overwrite a memory cell, e.g. to patch a program before running it
    pub fn write(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        self.memory.write(address, value)
    }

    pub fn memory(&self) -> &VMMemory {
        &self.memory
    }

    pub fn ip(&self) -> usize {
        self.executor.ip
    }

    pub fn relative_base(&self) -> i64 {
        self.executor.relative_base
    }

    pub fn status(&self) -> VMStatus {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status == VMStatus::Halted
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn label(&self) -> String {
        match self.id {
            Some(id) => format!("vm {}: ", id),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_program() {
        let mut vm = VM::new(&[3, 0, 4, 0, 99]);
        vm.push_input(42);
        assert_eq!(vm.run().unwrap(), VMStatus::Halted);
        assert_eq!(vm.take_output(), vec![42]);
        assert_eq!(vm.steps(), 3);
    }

    #[test]
    fn test_suspend_resume_is_idempotent() {
        let mut vm = VM::new(&[3, 0, 4, 0, 99]);
        let before = vm.memory().clone();

        for _ in 0..3 {
            assert_eq!(vm.run().unwrap(), VMStatus::AwaitingInput);
            assert_eq!(vm.ip(), 0);
            assert_eq!(vm.relative_base(), 0);
            assert_eq!(vm.memory(), &before);
            assert_eq!(vm.steps(), 0);
        }

        vm.push_input(-9);
        assert_eq!(vm.run().unwrap(), VMStatus::Halted);
        assert_eq!(vm.take_output(), vec![-9]);
    }

    #[test]
    fn test_halted_vm_stays_halted() {
        let mut vm = VM::new(&[99]);
        assert_eq!(vm.run().unwrap(), VMStatus::Halted);
        assert_eq!(vm.run().unwrap(), VMStatus::Halted);
        assert_eq!(vm.step().unwrap(), VMStatus::Halted);
        assert!(vm.is_halted());
    }

    #[test]
    fn test_cancellation_before_first_instruction() {
        let mut vm = VM::new(&[1101, 1, 1, 0, 99]);
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(vm.run_with_cancel(&token).unwrap(), VMStatus::Cancelled);
        assert_eq!(vm.ip(), 0);
        assert_eq!(vm.read(0).unwrap(), 1101);

        // Resuming without the token finishes the program
        assert_eq!(vm.run().unwrap(), VMStatus::Halted);
        assert_eq!(vm.read(0).unwrap(), 2);
    }

    #[test]
    fn test_host_patching_before_run() {
        let mut vm = VM::new(&[1, 0, 0, 0, 99]);
        vm.write(0, 2).unwrap();
        vm.run().unwrap();
        assert_eq!(vm.read(0).unwrap(), 4);
    }

    #[test]
    fn test_fatal_error_propagates() {
        let mut vm = VM::new(&[1, 0, 0, 0, 12]);
        assert_eq!(
            vm.run(),
            Err(VMError::UnknownOpcode { opcode: 12, address: 4 })
        );
    }

    #[test]
    fn test_ascii_output_split() {
        let vm = VM::new(&[99]);
        vm.output().extend([72, 105, 10, 19_349_722]);
        let output = vm.take_ascii_output();
        assert_eq!(output.text, "Hi\n");
        assert_eq!(output.values, vec![19_349_722]);
    }

    #[test]
    fn test_link_shares_queue() {
        let upstream = VM::new(&[104, 5, 99]);
        let mut downstream = VM::with_id(&[3, 0, 99], 1);
        VM::link(&upstream, &mut downstream);
        assert!(downstream.input().is_linked_to(upstream.output()));
        assert_eq!(downstream.id(), Some(1));
    }
}
