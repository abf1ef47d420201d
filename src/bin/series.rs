//! Plays the same pairing over and over and shows a running tally.
//!
//! ```text
//! series ./battleship-referee ./bot_a ./bot_b
//! ```

use std::io::Write;
use std::process::ExitCode;

use battleship_referee::series::{run_series, SeriesSettings, Tally};

fn bar(count: u32, target: u32) -> String {
    let width = target.min(80) as usize;
    let filled = (count as usize * width / target.max(1) as usize).min(width);
    format!("{}{}", "#".repeat(filled), " ".repeat(width - filled))
}

fn print_tally(tally: &Tally, target: u32, redraw: bool) {
    if redraw {
        // back up over the three lines drawn last time
        print!("\x1b[3A");
    }
    // clear line, colored label, default color
    println!("\x1b[2K\x1b[32mA:\x1b[39m [{}] {}", bar(tally.wins_a, target), tally.wins_a);
    println!("\x1b[2K\x1b[31mB:\x1b[39m [{}] {}", bar(tally.wins_b, target), tally.wins_b);
    println!("\x1b[2K\x1b[33mX:\x1b[39m [{}] {}", bar(tally.draws, target), tally.draws);
    let _ = std::io::stdout().flush();
}

fn main() -> ExitCode {
    let command: Vec<String> = std::env::args().skip(1).collect();
    if command.is_empty() {
        eprintln!("Usage:\n\n    series REFEREE PLAYER_A PLAYER_B");
        return ExitCode::from(battleship_referee::exit_codes::USAGE);
    }

    let settings = SeriesSettings::from_env();
    let mut drawn = false;
    let result = run_series(&command, settings, |tally| {
        print_tally(tally, settings.target(), drawn);
        drawn = true;
    });

    match result {
        Ok(tally) => {
            println!(
                "{} matches: A won {}, B won {}, {} draws",
                tally.games(),
                tally.wins_a,
                tally.wins_b,
                tally.draws
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
