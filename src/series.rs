//! Repeated matches between the same two players.
//!
//! The referee is run as a command, once per match, and its exit status is tallied. The series
//! stops as soon as one player reaches the target number of wins, or after three times that
//! many matches.
//!
//! # Environment Variables
//!
//! - `SERIES_TARGET` — Wins needed to end the series (default: `80`)
//! - `SERIES_PACE_MS` — Minimum time between the start of two matches (default: `500`)

use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracing::{debug, info, instrument};

use crate::exit_codes;

/// How long a series lasts and how fast it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSettings {
    pub(crate) target: u32,
    pub(crate) pace: Duration,
}

impl SeriesSettings {
    /// 80 wins, one match per half second.
    pub fn new() -> Self {
        Self {
            target: 80,
            pace: Duration::from_millis(500),
        }
    }

    /// Read `SERIES_TARGET` and `SERIES_PACE_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        fn parse_u64(var: &str) -> Option<u64> {
            std::env::var(var).ok()?.trim().parse().ok()
        }

        let defaults = Self::new();
        Self {
            target: parse_u64("SERIES_TARGET")
                .and_then(|t| u32::try_from(t).ok())
                .unwrap_or(defaults.target)
                .max(1),
            pace: parse_u64("SERIES_PACE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.pace),
        }
    }

    /// Set the number of wins that ends the series.
    pub fn with_target(mut self, target: u32) -> Self {
        self.target = target.max(1);
        self
    }

    /// Set the minimum time between the start of two matches.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Number of wins that ends the series.
    pub fn target(&self) -> u32 {
        self.target
    }
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Results so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Matches won by A.
    pub wins_a: u32,
    /// Matches won by B.
    pub wins_b: u32,
    /// Drawn matches.
    pub draws: u32,
}

impl Tally {
    /// Matches played.
    pub fn games(&self) -> u32 {
        self.wins_a + self.wins_b + self.draws
    }

    fn record(&mut self, code: i32) -> anyhow::Result<()> {
        match u8::try_from(code) {
            Ok(exit_codes::DRAW) => self.draws += 1,
            Ok(exit_codes::WIN_A) => self.wins_a += 1,
            Ok(exit_codes::WIN_B) => self.wins_b += 1,
            _ => bail!("match ended with unexpected exit status {code}"),
        }
        Ok(())
    }
}

/// Run `command` (program followed by its arguments) until the series is decided.
///
/// `on_progress` is called before every match and once at the end.
///
/// # Errors
/// Returns an error if the command is empty, cannot be run, or exits with a status that is not
/// a match result.
#[instrument(skip(on_progress))]
pub fn run_series(
    command: &[String],
    settings: SeriesSettings,
    mut on_progress: impl FnMut(&Tally),
) -> anyhow::Result<Tally> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };

    let mut tally = Tally::default();
    let mut last_start: Option<Instant> = None;
    let max_games = settings.target.saturating_mul(3);

    while tally.games() < max_games
        && tally.wins_a < settings.target
        && tally.wins_b < settings.target
    {
        on_progress(&tally);

        if let Some(start) = last_start {
            let elapsed = start.elapsed();
            if elapsed < settings.pace {
                std::thread::sleep(settings.pace - elapsed);
            }
        }
        last_start = Some(Instant::now());

        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("could not run '{program}'"))?;
        let Some(code) = status.code() else {
            bail!("match was killed by a signal ({status})");
        };
        debug!(code, game = tally.games() + 1, "match finished");
        tally.record(code)?;
    }

    on_progress(&tally);
    info!(?tally, "series over");
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn fast(target: u32) -> SeriesSettings {
        SeriesSettings::new()
            .with_target(target)
            .with_pace(Duration::ZERO)
    }

    #[test]
    fn stops_when_a_player_reaches_the_target() {
        let mut updates = 0;
        let tally = run_series(&sh("exit 2"), fast(3), |_| updates += 1).unwrap();
        assert_eq!(
            tally,
            Tally {
                wins_a: 0,
                wins_b: 3,
                draws: 0
            }
        );
        assert_eq!(updates, 4);
    }

    #[test]
    fn draws_are_capped_at_three_times_the_target() {
        let tally = run_series(&sh("exit 0"), fast(2), |_| {}).unwrap();
        assert_eq!(tally.draws, 6);
        assert_eq!(tally.games(), 6);
    }

    #[test]
    fn unexpected_status_is_an_error() {
        let err = run_series(&sh("exit 3"), fast(2), |_| {}).unwrap_err();
        assert!(err.to_string().contains("unexpected exit status 3"));
        assert!(run_series(&[], fast(2), |_| {}).is_err());
    }

    #[test]
    fn pace_spaces_out_matches() {
        let start = Instant::now();
        let settings = SeriesSettings::new()
            .with_target(2)
            .with_pace(Duration::from_millis(100));
        run_series(&sh("exit 1"), settings, |_| {}).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
