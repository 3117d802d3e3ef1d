//! Program images
//!
//! Programs are sequences of signed integers separated by commas and/or
//! whitespace, loaded verbatim into memory from address 0.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a program
#[derive(Debug, Error)]
pub enum ProgramError {
    /// A token is not a signed 64-bit integer
    #[error("Invalid integer '{token}' at position {position}")]
    Parse { position: usize, token: String },

    /// The source contained no integers
    #[error("Program is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed program image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    words: Vec<i64>,
}

impl Program {
    /// Parse comma- or newline-separated integers
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let words = source
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .enumerate()
            .map(|(position, token)| {
                token.parse::<i64>().map_err(|_| ProgramError::Parse {
                    position,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if words.is_empty() {
            return Err(ProgramError::Empty);
        }
        Ok(Self { words })
    }

    /// Read and parse a program file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProgramError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl From<Vec<i64>> for Program {
    fn from(words: Vec<i64>) -> Self {
        Self { words }
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.words.iter().map(|w| w.to_string()).collect();
        f.write_str(&items.join(","))
    }
}
