//! Stable exit codes of the referee binary.

/// Match ended in a draw.
pub const DRAW: u8 = 0;
/// Player A won.
pub const WIN_A: u8 = 1;
/// Player B won.
pub const WIN_B: u8 = 2;
/// Wrong arguments, invalid player specification or a peer program that could not be started.
pub const USAGE: u8 = 3;
/// The referee was interrupted (SIGINT, SIGTERM or SIGHUP) and killed its peer programs.
pub const INTERRUPTED: i32 = 4;
/// A human player closed their input while being prompted.
pub const CONSOLE_ABORTED: u8 = 96;
