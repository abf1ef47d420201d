use std::process::ExitCode;

use battleship_referee::agent::{PeerSpec, PlayerAgent, PlayerId, HUMAN};
use battleship_referee::configuration::Configuration;
use battleship_referee::exit_codes;
use battleship_referee::logger::init_logger;
use battleship_referee::referee::Referee;
use battleship_referee::signal_registry;

fn print_usage(name: &str) {
    eprintln!(
        "Usage:\n\n    {name} PLAYER_A PLAYER_B\n\n\
         PLAYER_A and PLAYER_B can each be:\n\n    \
         - '{HUMAN}': the player types on the keyboard\n    \
         - './PROGRAM': the player is a program"
    );
}

fn make_player(spec: &str, id: PlayerId, config: &Configuration) -> anyhow::Result<PlayerAgent> {
    let spec = PeerSpec::parse(spec)?;
    match &spec {
        PeerSpec::Human => eprintln!("player {id} is a human ..."),
        PeerSpec::Program(path) => {
            eprintln!("player {id} is the program '{}', starting it ...", path.display())
        }
    }
    Ok(PlayerAgent::from_spec(&spec, config)?)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        print_usage(args.first().map_or("battleship-referee", String::as_str));
        return ExitCode::from(exit_codes::USAGE);
    }

    let config = Configuration::from_env();
    if config.log() {
        if let Err(e) = init_logger() {
            eprintln!("warning: logging disabled: {e:#}");
        }
    }
    if let Err(e) = signal_registry::install_handlers() {
        tracing::warn!("could not install signal handlers: {e}");
    }

    let a = match make_player(&args[1], PlayerId::A, &config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(exit_codes::USAGE);
        }
    };
    let b = match make_player(&args[2], PlayerId::B, &config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(exit_codes::USAGE);
        }
    };

    match Referee::new(a, b, config).run() {
        Ok(report) => {
            match &report.forfeit {
                Some(forfeit) => eprintln!(
                    "{} (illegal move by player {}: {})",
                    report.result, forfeit.loser, forfeit.cause
                ),
                None => eprintln!("{}", report.result),
            }
            ExitCode::from(report.result.exit_code())
        }
        Err(aborted) => {
            eprintln!("{aborted}");
            ExitCode::from(exit_codes::CONSOLE_ABORTED)
        }
    }
}
