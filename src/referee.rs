//! The match state machine.
//!
//! A match goes through `Setup → PlacementA → PlacementB → Shootout → Scored`. Both players
//! type the same grammar (see [`crate::input`]), but they are not treated alike when they get
//! it wrong:
//!
//! - a human is told what was wrong and asked again, as often as needed;
//! - a peer program forfeits on its first bad line, timeout or broken pipe, and the opponent
//!   wins.
//!
//! During the shootout each shot is answered with exactly one [`Token`]: `Loss` if the shooter
//! has no ship left, else `Win` if the opponent has none, else the outcome of the shot.

use std::fmt::{self, Display};

use tracing::{debug, info, instrument, trace, warn};

use crate::agent::{AgentError, PlayerAgent, PlayerId, Token};
use crate::board::{Board, Outcome, SHIP_COUNT};
use crate::configuration::Configuration;
use crate::display::render_boards;
use crate::exit_codes;
use crate::input::{parse_placement, parse_shot, InputError};
use crate::line_protocol::ProtocolError;

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Player A won.
    WinA,
    /// Player B won.
    WinB,
    /// Nobody won.
    Draw,
}

impl MatchResult {
    fn win_for(id: PlayerId) -> MatchResult {
        match id {
            PlayerId::A => MatchResult::WinA,
            PlayerId::B => MatchResult::WinB,
        }
    }

    /// Process exit status for this result.
    pub fn exit_code(self) -> u8 {
        match self {
            MatchResult::WinA => exit_codes::WIN_A,
            MatchResult::WinB => exit_codes::WIN_B,
            MatchResult::Draw => exit_codes::DRAW,
        }
    }
}

impl Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::WinA => write!(f, "player A has won!"),
            MatchResult::WinB => write!(f, "player B has won!"),
            MatchResult::Draw => write!(f, "draw ..."),
        }
    }
}

/// A peer program lost the match by misbehaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forfeit {
    /// The side that misbehaved.
    pub loser: PlayerId,
    /// What it did wrong.
    pub cause: String,
}

/// Everything known about a finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    /// Who won.
    pub result: MatchResult,
    /// Shootout rounds started.
    pub rounds: u32,
    /// Set if the match ended because a peer program misbehaved.
    pub forfeit: Option<Forfeit>,
    /// Ship cells left afloat on A's and B's board.
    pub live: [usize; 2],
}

/// A human closed their input: the match cannot go on.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("player {0} aborted the match")]
pub struct Aborted(pub PlayerId);

/// Phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Players are being set up.
    Setup,
    /// A places its ships.
    PlacementA,
    /// B places its ships.
    PlacementB,
    /// Players take turns shooting.
    Shootout,
    /// The match is over.
    Scored,
}

#[derive(Debug)]
struct Side {
    id: PlayerId,
    agent: PlayerAgent,
    board: Board,
    defeated: bool,
}

impl Side {
    fn alive(&self) -> bool {
        !self.defeated && self.board.is_alive()
    }
}

/// How a single request to a player ended.
enum Turn<T> {
    Done(T),
    Forfeit(Forfeit),
}

/// Runs one match between two players.
#[derive(Debug)]
pub struct Referee {
    sides: [Side; 2],
    config: Configuration,
    phase: Phase,
    rounds: u32,
}

impl Referee {
    /// Prepare a match between `a` and `b`.
    pub fn new(a: PlayerAgent, b: PlayerAgent, config: Configuration) -> Referee {
        let side = |id, agent| Side {
            id,
            agent,
            board: Board::new(),
            defeated: false,
        };
        Referee {
            sides: [side(PlayerId::A, a), side(PlayerId::B, b)],
            config,
            phase: Phase::Setup,
            rounds: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Play the whole match.
    ///
    /// Peer programs are killed when the referee is dropped, i.e. at the latest when this
    /// returns.
    #[instrument(skip_all)]
    pub fn run(mut self) -> Result<MatchReport, Aborted> {
        for (id, phase) in [(PlayerId::A, Phase::PlacementA), (PlayerId::B, Phase::PlacementB)] {
            self.phase = phase;
            eprintln!("\nplayer {id} places ships:");
            info!(?phase, "placement");
            if let Turn::Forfeit(forfeit) = self.place_fleet(id)? {
                return Ok(self.forfeited(forfeit));
            }
        }

        let both_machines = self.sides.iter().all(|s| !s.agent.is_human());
        if both_machines && self.config.verbose {
            let [a, b] = &self.sides;
            eprint!("{}", render_boards((a.id, &a.board), (b.id, &b.board), true));
        }

        self.phase = Phase::Shootout;
        info!("shootout");
        while self.rounds < self.config.max_rounds {
            self.rounds += 1;
            debug!(round = self.rounds);
            for id in [PlayerId::A, PlayerId::B] {
                match self.shoot(id)? {
                    Turn::Done(outcome) => trace!(player = %id, %outcome),
                    Turn::Forfeit(forfeit) => return Ok(self.forfeited(forfeit)),
                }
            }
            if !self.sides.iter().all(Side::alive) {
                break;
            }
        }
        if self.sides.iter().all(Side::alive) {
            info!(rounds = self.rounds, "round limit reached");
            eprintln!("no winner after {} rounds", self.rounds);
            for side in &mut self.sides {
                side.defeated = true;
            }
        }

        Ok(self.score(None))
    }

    #[instrument(skip(self))]
    fn place_fleet(&mut self, id: PlayerId) -> Result<Turn<()>, Aborted> {
        let verbose = self.config.verbose;
        let side = self.side_mut(id);
        let human = side.agent.is_human();
        // shown as the opponent while placing: nothing on it yet
        let blank = Board::new();

        for ship in 1..=SHIP_COUNT {
            if human && verbose {
                eprint!("{}", render_boards((id, &side.board), (id.opponent(), &blank), false));
            }
            loop {
                if human {
                    eprint!("ship #{ship}: ");
                }
                let line = match side.agent.prompt() {
                    Ok(line) => line,
                    Err(AgentError::Aborted) => return Err(Aborted(id)),
                    Err(AgentError::Protocol(e)) => {
                        let boards =
                            render_boards((id, &side.board), (id.opponent(), &blank), false);
                        return Ok(Turn::Forfeit(protocol_forfeit(id, &e, &boards)));
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let placed = parse_placement(&line)
                    .and_then(|placement| side.board.place(placement).map_err(InputError::from));
                match placed {
                    Ok(()) => {
                        debug!(ship, %line, "ship placed");
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error player {id}:\n{e}");
                        if !human {
                            eprintln!("\nplaced so far:");
                            eprint!(
                                "{}",
                                render_boards((id, &side.board), (id.opponent(), &blank), false)
                            );
                            eprintln!("\nline was:\n{line}");
                            return Ok(Turn::Forfeit(Forfeit {
                                loser: id,
                                cause: format!("illegal placement: {e}"),
                            }));
                        }
                    }
                }
            }
        }

        if human && verbose {
            eprint!("{}", render_boards((id, &side.board), (id.opponent(), &blank), false));
        }
        Ok(Turn::Done(()))
    }

    #[instrument(skip(self), fields(round = self.rounds))]
    fn shoot(&mut self, id: PlayerId) -> Result<Turn<Outcome>, Aborted> {
        let verbose = self.config.verbose;
        let (me, other) = self.pair_mut(id);
        let human = me.agent.is_human();

        if human && verbose {
            eprint!("{}", render_boards((me.id, &me.board), (other.id, &other.board), false));
        }

        let outcome = loop {
            if human {
                eprint!("target: ");
            }
            let line = match me.agent.prompt() {
                Ok(line) => line,
                Err(AgentError::Aborted) => return Err(Aborted(id)),
                Err(AgentError::Protocol(e)) => {
                    let boards =
                        render_boards((me.id, &me.board), (other.id, &other.board), true);
                    return Ok(Turn::Forfeit(protocol_forfeit(id, &e, &boards)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let fired = parse_shot(&line).and_then(|shot| {
                other
                    .board
                    .incoming(shot.row, shot.col)
                    .map_err(InputError::from)
            });
            match fired {
                Ok(outcome) => {
                    debug!(%line, %outcome, "shot");
                    break outcome;
                }
                Err(e) => {
                    eprintln!("input error player {id}:\n{e}");
                    if !human {
                        eprintln!("\ncurrent boards:");
                        eprint!(
                            "{}",
                            render_boards((me.id, &me.board), (other.id, &other.board), true)
                        );
                        eprintln!("\nline was:\n{line}");
                        return Ok(Turn::Forfeit(Forfeit {
                            loser: id,
                            cause: format!("illegal move: {e}"),
                        }));
                    }
                }
            }
        };

        let token = if !me.board.is_alive() {
            Token::Loss
        } else if !other.board.is_alive() {
            Token::Win
        } else {
            Token::from(outcome)
        };
        match me.agent.send(token) {
            Ok(()) => Ok(Turn::Done(outcome)),
            Err(AgentError::Aborted) => Err(Aborted(id)),
            Err(AgentError::Protocol(e)) => {
                let boards = render_boards((me.id, &me.board), (other.id, &other.board), true);
                Ok(Turn::Forfeit(protocol_forfeit(id, &e, &boards)))
            }
        }
    }

    fn side_mut(&mut self, id: PlayerId) -> &mut Side {
        match id {
            PlayerId::A => &mut self.sides[0],
            PlayerId::B => &mut self.sides[1],
        }
    }

    /// `id`'s side and its opponent's.
    fn pair_mut(&mut self, id: PlayerId) -> (&mut Side, &mut Side) {
        let [a, b] = &mut self.sides;
        match id {
            PlayerId::A => (a, b),
            PlayerId::B => (b, a),
        }
    }

    fn forfeited(self, forfeit: Forfeit) -> MatchReport {
        warn!(loser = %forfeit.loser, cause = %forfeit.cause, "forfeit");
        self.score(Some(forfeit))
    }

    fn score(mut self, forfeit: Option<Forfeit>) -> MatchReport {
        self.phase = Phase::Scored;
        let result = match &forfeit {
            Some(forfeit) => MatchResult::win_for(forfeit.loser.opponent()),
            None => {
                let [a, b] = &self.sides;
                match (a.alive(), b.alive()) {
                    (true, false) => MatchResult::WinA,
                    (false, true) => MatchResult::WinB,
                    _ => MatchResult::Draw,
                }
            }
        };
        info!(?result, rounds = self.rounds, "match over");
        MatchReport {
            result,
            rounds: self.rounds,
            forfeit,
            live: [self.sides[0].board.live(), self.sides[1].board.live()],
        }
    }
}

fn protocol_forfeit(id: PlayerId, e: &ProtocolError, boards: &str) -> Forfeit {
    eprintln!("communication error player {id}:\n{e}");
    eprintln!("\ncurrent boards:");
    eprint!("{boards}");
    Forfeit {
        loser: id,
        cause: format!("communication error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    use super::*;
    use crate::agent::Console;

    /// Output shared with the test after the agent has been moved into the referee.
    #[derive(Clone, Default)]
    struct Transcript(Rc<RefCell<Vec<u8>>>);

    impl Write for Transcript {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transcript {
        fn tokens(&self) -> Vec<String> {
            String::from_utf8(self.0.borrow().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    const FLEET: &str = "0 0 R\n2 0 R\n4 0 R\n6 0 R\n";

    fn human(script: String) -> (PlayerAgent, Transcript) {
        let transcript = Transcript::default();
        let agent = PlayerAgent::Console(Console::new(
            Box::new(Cursor::new(script.into_bytes())),
            Box::new(transcript.clone()),
        ));
        (agent, transcript)
    }

    fn quiet() -> Configuration {
        Configuration::new().with_verbose(false)
    }

    fn init_test_logger() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    #[test]
    fn endless_misses_end_in_a_draw_after_the_round_limit() {
        init_test_logger();
        let shots = "9 9\n".repeat(150);
        let (a, a_out) = human(format!("{FLEET}{shots}"));
        let (b, b_out) = human(format!("{FLEET}{shots}"));

        let report = Referee::new(a, b, quiet()).run().unwrap();

        assert_eq!(report.result, MatchResult::Draw);
        assert_eq!(report.rounds, 100);
        assert_eq!(report.forfeit, None);
        assert_eq!(report.live, [16, 16]);
        assert_eq!(a_out.tokens().len(), 100);
        assert!(b_out.tokens().iter().all(|t| t == "F"));
    }

    #[test]
    fn humans_are_asked_again_after_bad_lines() {
        let mut a_script = String::from("0 0 R\n0 1 D\nnonsense\n\n2 0 R\n4 0 R\n6 0 R\n");
        a_script.push_str("banana\n12 3\n");
        for row in [0, 2, 4, 6] {
            for col in 0..4 {
                a_script.push_str(&format!("{row} {col}\n"));
            }
        }
        let (a, a_out) = human(a_script);
        let (b, b_out) = human(format!("{FLEET}{}", "9 9\n".repeat(16)));

        let report = Referee::new(a, b, quiet()).run().unwrap();

        assert_eq!(report.result, MatchResult::WinA);
        assert_eq!(report.rounds, 16);
        assert_eq!(report.live, [16, 0]);
        let a_tokens = a_out.tokens();
        assert_eq!(a_tokens.len(), 16);
        assert_eq!(&a_tokens[..4], ["T", "T", "T", "V"]);
        assert_eq!(a_tokens.last().map(String::as_str), Some("W"));
        // B still gets its turn in the last round, and learns it lost
        assert_eq!(b_out.tokens().last().map(String::as_str), Some("L"));
    }

    #[test]
    fn last_ship_sunk_by_both_in_the_same_round_is_a_draw() {
        let mut shots = String::new();
        for row in [0, 2, 4, 6] {
            for col in 0..4 {
                shots.push_str(&format!("{row} {col}\n"));
            }
        }
        let (a, a_out) = human(format!("{FLEET}{shots}"));
        let (b, b_out) = human(format!("{FLEET}{shots}"));

        let report = Referee::new(a, b, quiet()).run().unwrap();

        assert_eq!(report.result, MatchResult::Draw);
        assert_eq!(report.rounds, 16);
        assert_eq!(a_out.tokens().last().map(String::as_str), Some("W"));
        // B's own last ship was sunk right before its shot
        assert_eq!(b_out.tokens().last().map(String::as_str), Some("L"));
    }

    #[test]
    fn closed_console_aborts_the_match() {
        let (a, _) = human("0 0 R\n".to_string());
        let (b, _) = human(FLEET.to_string());

        let err = Referee::new(a, b, quiet()).run().unwrap_err();
        assert_eq!(err, Aborted(PlayerId::A));
    }

    #[test]
    fn results_map_to_exit_codes() {
        assert_eq!(MatchResult::Draw.exit_code(), 0);
        assert_eq!(MatchResult::WinA.exit_code(), 1);
        assert_eq!(MatchResult::WinB.exit_code(), 2);
    }

    #[test]
    fn new_referee_starts_in_setup() {
        let (a, _) = human(String::new());
        let (b, _) = human(String::new());
        assert_eq!(Referee::new(a, b, quiet()).phase(), Phase::Setup);
    }
}
