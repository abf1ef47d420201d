//! Config for the referee behaviors
//!
//! This module provides configuration options for controlling the behavior of the referee.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive, set the value to `"true"` to enable a flag.
//!
//! - `REFEREE_VERBOSE` — Render boards on the diagnostic stream for human players (default: `true`)
//! - `REFEREE_LOG` — Enable logging to a file (default: `false`)
//! - `REFEREE_AGENT_STDERR` — Let peer programs write to the referee's stderr (default: `true`)
//! - `REFEREE_READ_TIMEOUT_MS` — How long a single wait for a peer program may last (default: `2000`)
//! - `REFEREE_READ_ATTEMPTS` — Waits/reads allowed before a line must be complete (default: `3`)
//! - `REFEREE_MAX_CHUNK` — Maximum bytes taken from a peer program per read (default: `200`)
//! - `REFEREE_MAX_ROUNDS` — Rounds after which the match is declared a draw (default: `100`)

use std::time::Duration;

/// Configuration for referee behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) agent_stderr: bool,
    pub(crate) read_timeout: Duration,
    pub(crate) read_attempts: u32,
    pub(crate) max_chunk: usize,
    pub(crate) max_rounds: u32,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Boards are rendered on stderr before a human has to type.
    /// - Logging to file is disabled.
    /// - Peer programs inherit the referee's stderr.
    /// - A peer program gets 3 waits of 2 seconds to deliver a line, read 200 bytes at a time.
    /// - A match lasts at most 100 rounds.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            agent_stderr: true,
            read_timeout: Duration::from_millis(2000),
            read_attempts: 3,
            max_chunk: 200,
            max_rounds: 100,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the [module documentation](self) for the recognized variables. Any unset or
    /// unparsable value results in using the default value for that field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::new();
        Self {
            verbose: get_env_flag("REFEREE_VERBOSE", defaults.verbose),
            log: get_env_flag("REFEREE_LOG", defaults.log),
            agent_stderr: get_env_flag("REFEREE_AGENT_STDERR", defaults.agent_stderr),
            read_timeout: Duration::from_millis(get_env_number(
                "REFEREE_READ_TIMEOUT_MS",
                defaults.read_timeout.as_millis() as u64,
            )),
            read_attempts: get_env_number("REFEREE_READ_ATTEMPTS", defaults.read_attempts).max(1),
            max_chunk: get_env_number("REFEREE_MAX_CHUNK", defaults.max_chunk).max(1),
            max_rounds: get_env_number("REFEREE_MAX_ROUNDS", defaults.max_rounds),
        }
    }

    /// Enable or disable board rendering for human players.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Let peer programs write to the referee's stderr, or discard what they write there.
    pub fn with_agent_stderr(mut self, value: bool) -> Self {
        self.agent_stderr = value;
        self
    }

    /// Set how long a single wait for a peer program's output may last.
    pub fn with_read_timeout(mut self, value: Duration) -> Self {
        self.read_timeout = value;
        self
    }

    /// Set the number of waits/reads a peer program gets to complete one line.
    ///
    /// Values below 1 are raised to 1.
    pub fn with_read_attempts(mut self, value: u32) -> Self {
        self.read_attempts = value.max(1);
        self
    }

    /// Set the maximum number of bytes taken from a peer program per read.
    ///
    /// Values below 1 are raised to 1.
    pub fn with_max_chunk(mut self, value: usize) -> Self {
        self.max_chunk = value.max(1);
        self
    }

    /// Set the number of rounds after which a match is declared a draw.
    pub fn with_max_rounds(mut self, value: u32) -> Self {
        self.max_rounds = value;
        self
    }

    /// True if logging to file was requested.
    pub fn log(&self) -> bool {
        self.log
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let config = Configuration::new()
            .with_verbose(false)
            .with_read_timeout(Duration::from_millis(50))
            .with_read_attempts(0)
            .with_max_rounds(7);

        assert!(!config.verbose);
        assert_eq!(config.read_timeout, Duration::from_millis(50));
        assert_eq!(config.read_attempts, 1);
        assert_eq!(config.max_rounds, 7);
        assert_eq!(config.max_chunk, 200);
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(Configuration::default(), Configuration::new());
    }
}
