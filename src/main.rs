use std::process;

use clap::{Arg, ArgAction, Command};
use intnet::cli::{
    amplify_command, disasm_command, handle_amplify_command, handle_disasm_command,
    handle_network_command, handle_run_command, network_command, run_command,
};

fn main() {
    // Parse command line arguments
    let matches = Command::new("intnet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Integer register/memory VM and simulated packet network")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log VM and network activity (RUST_LOG takes precedence)")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(run_command())
        .subcommand(network_command())
        .subcommand(amplify_command())
        .subcommand(disasm_command())
        .get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match matches.subcommand() {
        Some(("run", sub_matches)) => handle_run_command(sub_matches),
        Some(("network", sub_matches)) => handle_network_command(sub_matches),
        Some(("amplify", sub_matches)) => handle_amplify_command(sub_matches),
        Some(("disasm", sub_matches)) => handle_disasm_command(sub_matches),
        _ => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
