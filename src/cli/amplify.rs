use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::cli::{load_program, program_arg, AppError};
use crate::pipeline::{best_phase_setting, Pipeline, PipelineOutcome, Topology};
use crate::vm::CancellationToken;

/// Create the `amplify` command
pub fn amplify_command() -> Command {
    Command::new("amplify")
        .about("Run one VM per phase setting, each feeding the next")
        .arg(program_arg())
        .arg(
            Arg::new("phases")
                .long("phases")
                .value_name("LIST")
                .help("Comma-separated phase settings, one per stage")
                .value_parser(clap::value_parser!(i64))
                .value_delimiter(',')
                .allow_hyphen_values(true)
                .required(true),
        )
        .arg(
            Arg::new("feedback")
                .long("feedback")
                .help("Feed the last stage's output back into the first stage")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .help("Try every ordering of the phases and report the strongest signal")
                .action(ArgAction::SetTrue),
        )
}

/// Handle the `amplify` command
pub fn handle_amplify_command(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let phases: Vec<i64> = matches
        .get_many::<i64>("phases")
        .ok_or("Missing --phases")?
        .copied()
        .collect();
    let topology = if matches.get_flag("feedback") {
        Topology::Feedback
    } else {
        Topology::Chain
    };

    if matches.get_flag("search") {
        let (signal, best) = best_phase_setting(program.as_slice(), &phases, topology)?
            .ok_or("No phase ordering produced a signal")?;
        println!("Signal: {}", signal);
        println!("Phases: {}", join(&best));
        return Ok(());
    }

    let mut pipeline = Pipeline::new(program.as_slice(), &phases, topology);
    match pipeline.run(&CancellationToken::new())? {
        PipelineOutcome::Finished(Some(signal)) => {
            println!("Signal: {}", signal);
            Ok(())
        }
        PipelineOutcome::Finished(None) => Err("Last stage halted without output".into()),
        PipelineOutcome::Stalled => Err("Pipeline stalled waiting for input".into()),
        PipelineOutcome::Cancelled => Err("Pipeline cancelled".into()),
    }
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
