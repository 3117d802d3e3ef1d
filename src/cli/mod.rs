pub mod amplify;
pub mod disasm;
pub mod network;
pub mod run;

use std::fs;
use std::path::Path;

use clap::{Arg, ArgMatches};
use thiserror::Error;

use crate::config::ConfigError;
use crate::network::NetworkError;
use crate::program::{Program, ProgramError};
use crate::vm::VMError;

// Re-export key components
pub use amplify::{amplify_command, handle_amplify_command};
pub use disasm::{disasm_command, handle_disasm_command};
pub use network::{handle_network_command, network_command};
pub use run::{handle_run_command, run_command};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VM error: {0}")]
    VM(#[from] VMError),

    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Other(s.to_string())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}

/// The `--program FILE` argument shared by every subcommand
pub(crate) fn program_arg() -> Arg {
    Arg::new("program")
        .short('p')
        .long("program")
        .value_name("FILE")
        .help("Program file: comma- or newline-separated integers")
        .required(true)
}

/// Load the program named by `--program`
pub(crate) fn load_program(matches: &ArgMatches) -> Result<Program, AppError> {
    let program_path = matches
        .get_one::<String>("program")
        .ok_or("Missing --program")?;
    let path = Path::new(program_path);

    if !path.exists() {
        return Err(format!("Program file not found: {}", program_path).into());
    }
    Ok(Program::parse(&fs::read_to_string(path)?)?)
}
