use clap::{ArgMatches, Command};

use crate::cli::{load_program, program_arg, AppError};
use crate::vm::disassemble;

/// Create the `disasm` command
pub fn disasm_command() -> Command {
    Command::new("disasm")
        .about("List a program's instructions")
        .arg(program_arg())
}

/// Handle the `disasm` command
pub fn handle_disasm_command(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    for line in disassemble(program.as_slice()) {
        println!("{}", line);
    }
    Ok(())
}
