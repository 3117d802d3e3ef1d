//! Instruction decoding
//!
//! An instruction word packs the opcode into its two least-significant
//! decimal digits; each higher digit, least-significant first, is the mode of
//! the corresponding parameter. Missing digits mean position mode.

use crate::vm::errors::VMError;
use crate::vm::memory::VMMemory;
use crate::vm::types::{Instruction, Mode, Opcode, Param};

/// Decode the instruction stored at `ip`
pub fn decode(memory: &VMMemory, ip: usize) -> Result<Instruction, VMError> {
    let base = address_of(ip)?;
    let word = memory.read(base)?;

    let code = word % 100;
    let opcode = Opcode::from_code(code).ok_or(VMError::UnknownOpcode {
        opcode: code,
        address: ip,
    })?;

    let mut modes = word / 100;
    let mut params = Vec::with_capacity(opcode.param_count());
    for offset in 1..=opcode.param_count() {
        let digit = modes % 10;
        modes /= 10;
        let mode = Mode::from_digit(digit).ok_or(VMError::UnknownMode {
            mode: digit,
            address: ip,
        })?;
        let value = memory.read(base + offset as i64)?;
        params.push(Param { value, mode });
    }

    Ok(Instruction {
        address: ip,
        opcode,
        params,
    })
}

fn address_of(ip: usize) -> Result<i64, VMError> {
    i64::try_from(ip).map_err(|_| VMError::InvalidAddress(i64::MAX))
}
