//! # Battleship Referee
//!
//! Referee for two-player battleship matches on a fixed 10×10 board with four ships of length
//! four per player. Each player is either a human typing on the console or a peer program
//! started by the referee and driven over its stdin/stdout.
//!
//! It provides:
//! - Peer program lifecycle: spawning, kill-on-drop, emergency cleanup on signals
//!   ([`process`], [`signal_registry`])
//! - Timeout-bounded line exchange with peer programs ([`line_protocol`])
//! - The match itself: placement, shootout, forfeits and scoring ([`referee`])
//! - Running many matches in a row and tallying results ([`series`])
//!
//! # Documentation Overview
//!
//! - For the rules and how misbehaving players are handled, see the [`referee`] module.
//! - For the text players have to type, see the [`input`] module.
//! - For configuring timeouts, round limit and logging, see
//!   [`Configuration`](crate::configuration::Configuration).
//!
//! # Usage Example
//!
//! ```no_run
//! use battleship_referee::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env();
//!     let a = PlayerAgent::from_spec(&PeerSpec::parse("./my_bot")?, &config)?;
//!     let b = PlayerAgent::from_spec(&PeerSpec::parse("mensch")?, &config)?;
//!
//!     let report = Referee::new(a, b, config).run()?;
//!     println!("{} after {} rounds", report.result, report.rounds);
//!     Ok(())
//! }
//! ```
//!
//! # Example Peer Program
//!
//! A peer program reads status tokens on stdin and writes its moves on stdout, one per line:
//!
//! ```no_run
//! use std::io::{self, BufRead, Write};
//!
//! fn main() -> io::Result<()> {
//!     let mut out = io::stdout();
//!     for row in [0, 2, 4, 6] {
//!         writeln!(out, "{row} 0 R")?;
//!     }
//!     out.flush()?;
//!
//!     let mut tokens = io::stdin().lock().lines();
//!     for row in 0..10 {
//!         for col in 0..10 {
//!             writeln!(out, "{row} {col}")?;
//!             out.flush()?;
//!             match tokens.next().transpose()?.as_deref() {
//!                 Some("W") | Some("L") | None => return Ok(()),
//!                 _ => {}
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Peer Program Requirements
//!
//! - placement lines are `row column direction` with direction `R` (right) or `U` (down)
//! - shot lines are `row column`
//! - each shot is answered with one token: `F` miss, `T` hit, `V` sunk, `W` won, `L` lost
//! - every line must arrive within the configured timeout, and the first invalid line loses
//!   the match
#![warn(missing_docs)]

pub mod agent;
pub mod board;
pub mod configuration;
pub mod display;
pub mod exit_codes;
pub mod input;
pub mod line_protocol;
pub mod logger;
pub mod process;
pub mod referee;
pub mod series;
pub mod signal_registry;

pub use anyhow;

/// Commonly used types for quick access.
///
/// ```rust
/// use battleship_referee::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{PeerSpec, PlayerAgent, PlayerId, Token};
    pub use crate::board::{Board, Orientation, Outcome, ShipPlacement};
    pub use crate::configuration::Configuration;
    pub use crate::referee::{MatchReport, MatchResult, Referee};
}
