use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use serde_json::json;

use crate::cli::{load_program, program_arg, AppError};
use crate::config::NetworkConfig;
use crate::events::{set_log_file, set_log_format, Event, LogFormat};
use crate::network::{watch, ConvergenceWatcher, Network, NetworkStatus};
use crate::vm::CancellationToken;

/// Create the `network` command
pub fn network_command() -> Command {
    Command::new("network")
        .about("Simulate a network of VMs exchanging packets through a NAT")
        .arg(program_arg())
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON settings file (defaults come from INTNET_* variables)"),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .value_name("N")
                .help("Number of computers")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("nat-address")
                .long("nat-address")
                .value_name("ID")
                .help("Reserved recipient id of the NAT")
                .value_parser(clap::value_parser!(i64))
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("idle-input")
                .long("idle-input")
                .value_name("N")
                .help("Value fed to a computer with no packet waiting")
                .value_parser(clap::value_parser!(i64))
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("MS")
                .help("Give up if the NAT has not converged after this long")
                .value_parser(clap::value_parser!(u64))
                .default_value("10000"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Report events as JSON lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Also append reported events to this file"),
        )
}

/// Settings from file or environment, overridden by command-line flags
fn resolve_config(matches: &ArgMatches) -> Result<NetworkConfig, AppError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => NetworkConfig::from_file(path)?,
        None => NetworkConfig::from_env()?,
    };
    if let Some(size) = matches.get_one::<usize>("size") {
        config.size = *size;
    }
    if let Some(address) = matches.get_one::<i64>("nat-address") {
        config.nat_address = *address;
    }
    if let Some(value) = matches.get_one::<i64>("idle-input") {
        config.idle_input = *value;
    }
    config.validate()?;
    Ok(config)
}

/// Handle the `network` command
pub fn handle_network_command(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let config = resolve_config(matches)?;
    let timeout = Duration::from_millis(matches.get_one::<u64>("timeout-ms").copied().unwrap_or(10_000));

    if matches.get_flag("json") {
        set_log_format(LogFormat::Json);
    }
    set_log_file(matches.get_one::<String>("log-file").map(PathBuf::from));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(simulate(program.as_slice(), config, timeout))
}

async fn simulate(program: &[i64], config: NetworkConfig, timeout: Duration) -> Result<(), AppError> {
    let nat_address = config.nat_address;
    let mut network = Network::new(program, config)?;
    let token = CancellationToken::new();

    let deadline = token.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        deadline.cancel();
    });

    let (sender, receiver) = futures::channel::mpsc::unbounded();
    let (status, watcher) = tokio::join!(
        network.run_async(&token, sender),
        watch(receiver, ConvergenceWatcher::new(nat_address), token.clone())
    );
    timer.abort();
    let status = status?;
    info!("network stopped ({:?}) after {} ticks", status, network.ticks());

    if let Some(packet) = watcher.first_nat_packet() {
        Event::info("nat", format!("first packet to NAT: y={}", packet.y))
            .with_data(json!({ "x": packet.x, "y": packet.y }))
            .emit()?;
    }

    match (watcher.converged(), status) {
        (Some(y), _) => {
            Event::info("nat", format!("converged on y={}", y))
                .with_data(json!({ "y": y, "ticks": network.ticks(), "forwards": network.nat().forwarded() }))
                .emit()?;
            Ok(())
        }
        (None, NetworkStatus::Halted) => {
            Event::warn("network", "every computer halted before the NAT converged").emit()?;
            Err("Network halted without converging".into())
        }
        (None, NetworkStatus::Cancelled) => {
            Event::warn("network", format!("no convergence within {:?}", timeout)).emit()?;
            Err("Network did not converge before the timeout".into())
        }
    }
}
