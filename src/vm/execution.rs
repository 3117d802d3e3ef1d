//! VM instruction execution logic
//!
//! `VMExecution` owns the control registers (instruction pointer and relative
//! base) and applies one decoded instruction at a time against memory and the
//! I/O channels. Control flow decisions (suspend, halt) are reported back to
//! the run loop through `Step`.

use log::trace;

use crate::vm::channel::Channel;
use crate::vm::errors::VMError;
use crate::vm::memory::VMMemory;
use crate::vm::types::{Instruction, Mode, Opcode, Param};

/// What the run loop should do after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep fetching
    Continue,
    /// Input was required but the channel is empty; `ip` is unchanged
    Suspend,
    /// A halt instruction was executed
    Halt,
}

/// Control registers and instruction semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VMExecution {
    /// Address of the next instruction to decode
    pub ip: usize,

    /// Base added to relative-mode parameters
    pub relative_base: i64,
}

impl VMExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `instruction`, mutating memory, channels and registers
    pub fn execute(
        &mut self,
        instruction: &Instruction,
        memory: &mut VMMemory,
        input: &Channel,
        output: &Channel,
    ) -> Result<Step, VMError> {
        trace!("{:04}: {}", instruction.address, instruction);
        let params = &instruction.params;

        match instruction.opcode {
            Opcode::Add => {
                let value = self.read(memory, params[0])?
                    .wrapping_add(self.read(memory, params[1])?);
                self.write(memory, instruction, params[2], value)?;
            }
            Opcode::Mul => {
                let value = self.read(memory, params[0])?
                    .wrapping_mul(self.read(memory, params[1])?);
                self.write(memory, instruction, params[2], value)?;
            }
            Opcode::Input => {
                // Resolve the target first so a bad target never consumes input
                let target = self.target(instruction, params[0])?;
                let Some(value) = input.pop() else {
                    return Ok(Step::Suspend);
                };
                memory.write(target, value)?;
            }
            Opcode::Output => {
                output.push(self.read(memory, params[0])?);
            }
            Opcode::JumpIfTrue => {
                if self.read(memory, params[0])? != 0 {
                    let destination = self.read(memory, params[1])?;
                    return self.jump(destination);
                }
            }
            Opcode::JumpIfFalse => {
                if self.read(memory, params[0])? == 0 {
                    let destination = self.read(memory, params[1])?;
                    return self.jump(destination);
                }
            }
            Opcode::LessThan => {
                let value = self.read(memory, params[0])? < self.read(memory, params[1])?;
                self.write(memory, instruction, params[2], value as i64)?;
            }
            Opcode::Equals => {
                let value = self.read(memory, params[0])? == self.read(memory, params[1])?;
                self.write(memory, instruction, params[2], value as i64)?;
            }
            Opcode::AdjustRelativeBase => {
                let offset = self.read(memory, params[0])?;
                self.relative_base = self.relative_base.wrapping_add(offset);
            }
            Opcode::Halt => return Ok(Step::Halt),
        }

        self.ip += instruction.width();
        Ok(Step::Continue)
    }

    /// Effective value of a parameter
    fn read(&self, memory: &VMMemory, param: Param) -> Result<i64, VMError> {
        match param.mode {
            Mode::Position => memory.read(param.value),
            Mode::Immediate => Ok(param.value),
            Mode::Relative => memory.read(self.relative_base.wrapping_add(param.value)),
        }
    }

    /// Effective address of a write destination, checked before any side effect
    fn target(&self, instruction: &Instruction, param: Param) -> Result<i64, VMError> {
        let address = match param.mode {
            Mode::Position => param.value,
            Mode::Relative => self.relative_base.wrapping_add(param.value),
            Mode::Immediate => {
                return Err(VMError::IllegalWriteTarget {
                    address: instruction.address,
                })
            }
        };
        if address < 0 {
            return Err(VMError::InvalidAddress(address));
        }
        Ok(address)
    }

    fn write(
        &self,
        memory: &mut VMMemory,
        instruction: &Instruction,
        param: Param,
        value: i64,
    ) -> Result<(), VMError> {
        let target = self.target(instruction, param)?;
        memory.write(target, value)
    }

    fn jump(&mut self, destination: i64) -> Result<Step, VMError> {
        self.ip = usize::try_from(destination).map_err(|_| VMError::InvalidAddress(destination))?;
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::decoder::decode;

    fn execute_at(
        executor: &mut VMExecution,
        memory: &mut VMMemory,
        input: &Channel,
        output: &Channel,
    ) -> Result<Step, VMError> {
        let instruction = decode(memory, executor.ip)?;
        executor.execute(&instruction, memory, input, output)
    }

    #[test]
    fn test_add_advances_ip() {
        let mut memory = VMMemory::load(&[1101, 2, 3, 5, 99]);
        let mut executor = VMExecution::new();
        let (input, output) = (Channel::new(), Channel::new());

        let step = execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(executor.ip, 4);
        assert_eq!(memory.read(5).unwrap(), 5);
    }

    #[test]
    fn test_input_suspends_without_moving() {
        let mut memory = VMMemory::load(&[3, 0, 99]);
        let mut executor = VMExecution::new();
        let (input, output) = (Channel::new(), Channel::new());

        let step = execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(step, Step::Suspend);
        assert_eq!(executor.ip, 0);
        assert_eq!(memory.as_slice(), &[3, 0, 99]);

        input.push(7);
        let step = execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(executor.ip, 2);
        assert_eq!(memory.read(0).unwrap(), 7);
    }

    #[test]
    fn test_jump_taken_and_not_taken() {
        let (input, output) = (Channel::new(), Channel::new());

        let mut memory = VMMemory::load(&[1105, 1, 9]);
        let mut executor = VMExecution::new();
        execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(executor.ip, 9);

        let mut memory = VMMemory::load(&[1105, 0, 9]);
        let mut executor = VMExecution::new();
        execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(executor.ip, 3);

        let mut memory = VMMemory::load(&[1106, 0, 7]);
        let mut executor = VMExecution::new();
        execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(executor.ip, 7);
    }

    #[test]
    fn test_relative_base_and_relative_write() {
        let mut memory = VMMemory::load(&[109, 10, 21101, 4, 5, -3, 99]);
        let mut executor = VMExecution::new();
        let (input, output) = (Channel::new(), Channel::new());

        execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(executor.relative_base, 10);
        execute_at(&mut executor, &mut memory, &input, &output).unwrap();
        assert_eq!(memory.read(7).unwrap(), 9);
    }

    #[test]
    fn test_immediate_write_target_is_rejected() {
        let mut memory = VMMemory::load(&[11101, 1, 1, 0, 99]);
        let mut executor = VMExecution::new();
        let (input, output) = (Channel::new(), Channel::new());

        let result = execute_at(&mut executor, &mut memory, &input, &output);
        assert_eq!(result, Err(VMError::IllegalWriteTarget { address: 0 }));

        let mut memory = VMMemory::load(&[103, 0]);
        input.push(5);
        let result = execute_at(&mut VMExecution::new(), &mut memory, &input, &output);
        assert_eq!(result, Err(VMError::IllegalWriteTarget { address: 0 }));
        assert_eq!(input.len(), 1);

        // Negative relative target: the input stays queued
        let mut memory = VMMemory::load(&[203, -5, 99]);
        let result = execute_at(&mut VMExecution::new(), &mut memory, &input, &output);
        assert_eq!(result, Err(VMError::InvalidAddress(-5)));
        assert_eq!(input.len(), 1);

        let mut memory = VMMemory::load(&[3, -2, 99]);
        let result = execute_at(&mut VMExecution::new(), &mut memory, &input, &output);
        assert_eq!(result, Err(VMError::InvalidAddress(-2)));
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_negative_jump_target() {
        let mut memory = VMMemory::load(&[1105, 1, -4]);
        let mut executor = VMExecution::new();
        let (input, output) = (Channel::new(), Channel::new());

        let result = execute_at(&mut executor, &mut memory, &input, &output);
        assert_eq!(result, Err(VMError::InvalidAddress(-4)));
    }
}
