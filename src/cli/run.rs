use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;
use rustyline::error::ReadlineError;

use crate::cli::{load_program, program_arg, AppError};
use crate::vm::{AsciiOutput, VMStatus, VM};

/// Create the `run` command
pub fn run_command() -> Command {
    Command::new("run")
        .about("Run a single VM until it halts or needs more input")
        .arg(program_arg())
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("N")
                .help("Integer to queue on the input channel (can be used multiple times)")
                .value_parser(clap::value_parser!(i64))
                .allow_hyphen_values(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("patch")
                .long("patch")
                .value_name("ADDR=VALUE")
                .help("Overwrite a memory cell before running (can be used multiple times)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ascii-input")
                .long("ascii-input")
                .value_name("LINE")
                .help("Queue a line of ASCII text followed by a newline (can be used multiple times)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ascii")
                .long("ascii")
                .help("Print output values below 128 as text")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interactive")
                .long("interactive")
                .help("Prompt for a line of ASCII input whenever the VM needs input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-memory")
                .long("dump-memory")
                .help("Print memory after the run")
                .action(ArgAction::SetTrue),
        )
}

/// Handle the `run` command
pub fn handle_run_command(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let mut vm = VM::new(program.as_slice());

    if let Some(patches) = matches.get_many::<String>("patch") {
        for patch in patches {
            let (address, value) = parse_patch(patch)?;
            debug!("patching [{}] = {}", address, value);
            vm.write(address, value)?;
        }
    }
    if let Some(values) = matches.get_many::<i64>("input") {
        vm.input().extend(values.copied());
    }
    if let Some(lines) = matches.get_many::<String>("ascii-input") {
        for line in lines {
            vm.push_ascii(&format!("{}\n", line));
        }
    }

    if matches.get_flag("interactive") {
        run_interactive(&mut vm)?;
    } else {
        let status = vm.run()?;
        if matches.get_flag("ascii") {
            print_ascii(&vm.take_ascii_output());
        } else {
            println!("Output: {}", join(&vm.take_output()));
        }
        println!("Status: {}", status);
    }

    if matches.get_flag("dump-memory") {
        println!("{}", vm.memory());
    }
    Ok(())
}

fn run_interactive(vm: &mut VM) -> Result<(), AppError> {
    let mut rl = rustyline::DefaultEditor::new().map_err(|e| AppError::Other(e.to_string()))?;

    loop {
        let status = vm.run()?;
        print_ascii(&vm.take_ascii_output());

        if status != VMStatus::AwaitingInput {
            println!("Status: {}", status);
            break;
        }

        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted (Ctrl+C)");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("EOF (Ctrl+D)");
                break;
            }
            Err(e) => {
                return Err(AppError::Other(format!("Error reading input: {}", e)));
            }
        };

        if let Err(e) = rl.add_history_entry(&line) {
            return Err(AppError::Other(format!("Error adding to history: {}", e)));
        }
        vm.push_ascii(&format!("{}\n", line));
    }

    Ok(())
}

fn parse_patch(patch: &str) -> Result<(i64, i64), AppError> {
    let invalid = || AppError::Other(format!("Invalid patch '{}', expected ADDR=VALUE", patch));
    let (address, value) = patch.split_once('=').ok_or_else(invalid)?;
    let address = address.trim().parse().map_err(|_| invalid())?;
    let value = value.trim().parse().map_err(|_| invalid())?;
    Ok((address, value))
}

fn print_ascii(output: &AsciiOutput) {
    print!("{}", output.text);
    if !output.values.is_empty() {
        println!("Output: {}", join(&output.values));
    }
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patch() {
        assert_eq!(parse_patch("1=12").unwrap(), (1, 12));
        assert_eq!(parse_patch(" 0 = -2 ").unwrap(), (0, -2));
        assert!(parse_patch("12").is_err());
        assert!(parse_patch("a=1").is_err());
    }

    #[test]
    fn test_command_accepts_negative_input() {
        let matches = run_command()
            .try_get_matches_from(["run", "-p", "prog.txt", "--input", "-5", "--input", "3"])
            .unwrap();
        let inputs: Vec<i64> = matches.get_many::<i64>("input").unwrap().copied().collect();
        assert_eq!(inputs, vec![-5, 3]);
    }
}
