//! Program listing for debugging
//!
//! Walks memory from address 0 and decodes instructions in sequence. Words
//! that do not decode (data, or code reached only through self-modification)
//! are listed as `DATA` and skipped one cell at a time.

use std::fmt;

use crate::vm::decoder::decode;
use crate::vm::memory::VMMemory;
use crate::vm::types::Instruction;

/// One line of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction(Instruction),
    Data { address: usize, value: i64 },
}

impl Line {
    pub fn address(&self) -> usize {
        match self {
            Line::Instruction(instruction) => instruction.address,
            Line::Data { address, .. } => *address,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Instruction(instruction) => write!(f, "{:04}: {}", instruction.address, instruction),
            Line::Data { address, value } => write!(f, "{:04}: DATA {}", address, value),
        }
    }
}

/// Disassemble a program image
pub fn disassemble(program: &[i64]) -> Vec<Line> {
    let memory = VMMemory::load(program);
    let mut lines = Vec::new();
    let mut address = 0;

    while address < program.len() {
        match decode(&memory, address) {
            // An instruction running off the end of the image is data
            Ok(instruction) if address + instruction.width() <= program.len() => {
                address += instruction.width();
                lines.push(Line::Instruction(instruction));
            }
            _ => {
                lines.push(Line::Data {
                    address,
                    value: program[address],
                });
                address += 1;
            }
        }
    }

    lines
}
