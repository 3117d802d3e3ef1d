//! VM memory
//!
//! A flat, zero-initialised store of signed 64-bit cells. Reads past the end
//! of the allocation see zero; writes past the end grow the allocation.
//! Writes far beyond the dense region land in a sparse map instead, so any
//! non-negative address is usable.

use std::collections::BTreeMap;
use std::fmt;

use crate::vm::errors::VMError;

/// Growable integer memory for the virtual machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VMMemory {
    cells: Vec<i64>,
    sparse: BTreeMap<usize, i64>,
}

/// How far past the dense region a write may grow it
const DENSE_GROWTH: usize = 1 << 20;

impl VMMemory {
    /// Create an empty memory space
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory holding a copy of `program` starting at address 0
    pub fn load(program: &[i64]) -> Self {
        Self {
            cells: program.to_vec(),
            sparse: BTreeMap::new(),
        }
    }

    /// Read the cell at `address`, returning 0 for unallocated cells
    pub fn read(&self, address: i64) -> Result<i64, VMError> {
        let index = Self::index(address)?;
        match self.cells.get(index) {
            Some(value) => Ok(*value),
            None => Ok(self.sparse.get(&index).copied().unwrap_or(0)),
        }
    }

    /// Store `value` at `address`, growing the allocation as needed
    pub fn write(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        let index = Self::index(address)?;
        if index < self.cells.len() {
            self.cells[index] = value;
        } else if index - self.cells.len() < DENSE_GROWTH {
            self.cells.resize(index + 1, 0);
            // Sparse cells now inside the dense region move into it
            let above = self.sparse.split_off(&(index + 1));
            for (address, cell) in std::mem::replace(&mut self.sparse, above) {
                self.cells[address] = cell;
            }
            self.cells[index] = value;
        } else {
            self.sparse.insert(index, value);
        }
        Ok(())
    }

    /// Number of cells in the dense region
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.sparse.is_empty()
    }

    /// The dense region, lowest address first
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    fn index(address: i64) -> Result<usize, VMError> {
        usize::try_from(address).map_err(|_| VMError::InvalidAddress(address))
    }
}

impl fmt::Display for VMMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.cells.iter().map(|v| v.to_string()).collect();
        write!(f, "Memory: [{}]", items.join(", "))?;
        for (address, value) in &self.sparse {
            write!(f, " [{}]={}", address, value)?;
        }
        Ok(())
    }
}
