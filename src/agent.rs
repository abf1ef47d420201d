//! The two kinds of player a referee talks to.

use std::fmt::{self, Display};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::board::Outcome;
use crate::configuration::Configuration;
use crate::line_protocol::ProtocolError;
use crate::process::{ChannelSettings, ChildProcess, ProcessError};

/// Word selecting a human player on the command line.
pub const HUMAN: &str = "mensch";

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    /// Places first and shoots first.
    A,
    /// Places second and shoots second.
    B,
}

impl PlayerId {
    /// The other side.
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::A => PlayerId::B,
            PlayerId::B => PlayerId::A,
        }
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::A => write!(f, "A"),
            PlayerId::B => write!(f, "B"),
        }
    }
}

/// Status sent to a player after each of its shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// The shot hit water.
    Miss,
    /// The shot hit a ship that is still afloat.
    Hit,
    /// The shot sank a ship.
    Sunk,
    /// The opponent has no ship left.
    Win,
    /// The player has no ship left.
    Loss,
}

impl Token {
    /// Single character sent over the wire.
    pub fn as_char(self) -> char {
        match self {
            Token::Miss => 'F',
            Token::Hit => 'T',
            Token::Sunk => 'V',
            Token::Win => 'W',
            Token::Loss => 'L',
        }
    }
}

impl From<Outcome> for Token {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Miss => Token::Miss,
            Outcome::Hit => Token::Hit,
            Outcome::Sunk => Token::Sunk,
        }
    }
}

/// Who plays a side, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSpec {
    /// A human typing on the console.
    Human,
    /// A program started by the referee.
    Program(PathBuf),
}

/// A command line player specification that is neither a human nor a program path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("program '{0}' must be an executable path (maybe you meant ./{0}?)")]
pub struct SpecError(pub String);

impl PeerSpec {
    /// `mensch` is a human, anything containing a path separator is a program.
    pub fn parse(spec: &str) -> Result<PeerSpec, SpecError> {
        if spec == HUMAN {
            Ok(PeerSpec::Human)
        } else if spec.contains('/') {
            Ok(PeerSpec::Program(PathBuf::from(spec)))
        } else {
            Err(SpecError(spec.to_string()))
        }
    }
}

/// Failure while talking to a player.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// A peer program misbehaved.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A human closed their input.
    #[error("aborted by user")]
    Aborted,
}

/// Where a human's lines come from.
enum ConsoleInput {
    /// The process stdin, locked only for the duration of one read so that two human players
    /// can share it.
    Stdin(io::Stdin),
    Reader(Box<dyn BufRead>),
}

impl ConsoleInput {
    fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        match self {
            ConsoleInput::Stdin(stdin) => stdin.read_line(line),
            ConsoleInput::Reader(reader) => reader.read_line(line),
        }
    }
}

/// Console endpoints of a human player.
pub struct Console {
    input: ConsoleInput,
    output: Box<dyn Write>,
}

impl Console {
    /// Read from stdin, answer on stdout.
    pub fn stdio() -> Self {
        Self {
            input: ConsoleInput::Stdin(io::stdin()),
            output: Box::new(io::stdout()),
        }
    }

    /// Read from `input`, answer on `output`.
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            input: ConsoleInput::Reader(input),
            output,
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// A player of the match: a human on a console, or a peer program.
///
/// Both kinds answer [`PlayerAgent::prompt`] and [`PlayerAgent::send`] the same way; what to do
/// when they misbehave is decided by the referee.
#[derive(Debug)]
pub enum PlayerAgent {
    /// Human player.
    Console(Console),
    /// Peer program, with the time it gets per wait.
    Machine {
        /// The running program.
        process: ChildProcess,
        /// How long a single wait for its output may last.
        timeout: Duration,
    },
}

impl PlayerAgent {
    /// Build the agent for `spec`, starting the program if there is one.
    #[instrument(skip(config))]
    pub fn from_spec(spec: &PeerSpec, config: &Configuration) -> Result<PlayerAgent, ProcessError> {
        match spec {
            PeerSpec::Human => Ok(PlayerAgent::Console(Console::stdio())),
            PeerSpec::Program(path) => {
                let settings = ChannelSettings {
                    max_chunk: config.max_chunk,
                    attempts: config.read_attempts,
                };
                let process = ChildProcess::spawn(path, config.agent_stderr, settings)?;
                Ok(PlayerAgent::Machine {
                    process,
                    timeout: config.read_timeout,
                })
            }
        }
    }

    /// True for a human player.
    pub fn is_human(&self) -> bool {
        matches!(self, PlayerAgent::Console(_))
    }

    /// Next line typed by the human or written by the program.
    pub fn prompt(&mut self) -> Result<String, AgentError> {
        match self {
            PlayerAgent::Console(console) => {
                let mut line = String::new();
                match console.input.read_line(&mut line) {
                    Ok(0) => Err(AgentError::Aborted),
                    Ok(_) => {
                        let trimmed = line.trim_end_matches(['\n', '\r']).len();
                        line.truncate(trimmed);
                        Ok(line)
                    }
                    Err(e) => {
                        warn!("could not read console input: {e}");
                        Err(AgentError::Aborted)
                    }
                }
            }
            PlayerAgent::Machine { process, timeout } => Ok(process.read_line(*timeout)?),
        }
    }

    /// Deliver a status token.
    pub fn send(&mut self, token: Token) -> Result<(), AgentError> {
        debug!(?token, "sending");
        match self {
            PlayerAgent::Console(console) => {
                // a human who stopped watching stdout can still keep playing
                if let Err(e) = writeln!(console.output, "{}", token.as_char())
                    .and_then(|()| console.output.flush())
                {
                    warn!("could not write to console: {e}");
                }
                Ok(())
            }
            PlayerAgent::Machine { process, .. } => {
                Ok(process.write_line(&token.as_char().to_string())?)
            }
        }
    }
}
