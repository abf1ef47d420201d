//! Peer program lifecycle: spawn with piped stdio, kill and reap exactly once.

use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::line_protocol::{LineChannel, ProtocolError};
use crate::signal_registry::{self, Slot};

/// A peer program could not be started.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// Process creation or image replacement failed.
    #[error("could not run '{path}': {source}")]
    Spawn {
        /// What was executed.
        path: PathBuf,
        /// Why it failed.
        #[source]
        source: std::io::Error,
    },
    /// The child was started but its pipes are missing.
    #[error("'{0}' was started without pipes")]
    MissingPipe(PathBuf),
}

/// Settings of the line channel wrapped around a child's pipes.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    /// Maximum bytes per read.
    pub max_chunk: usize,
    /// Waits/reads allowed before a line must be complete.
    pub attempts: u32,
}

/// A running peer program, talking line by line over its stdin and stdout.
///
/// The child is killed, reaped and its pipes closed exactly once: by [`ChildProcess::release`]
/// or on drop.
#[derive(Debug)]
pub struct ChildProcess {
    path: PathBuf,
    child: Child,
    channel: Option<LineChannel<ChildStdout, ChildStdin>>,
    slot: Option<Slot>,
    released: bool,
}

impl ChildProcess {
    /// Launch `path` with piped stdin/stdout.
    ///
    /// The child's stderr is inherited if `allow_stderr`, discarded otherwise.
    #[instrument(skip(settings))]
    pub fn spawn(
        path: &Path,
        allow_stderr: bool,
        settings: ChannelSettings,
    ) -> Result<ChildProcess, ProcessError> {
        let mut cmd = Command::new(path);
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        if !allow_stderr {
            cmd.stderr(Stdio::null());
        }
        // exec failures are reported back through std's internal CLOEXEC pipe
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessError::MissingPipe(path.to_path_buf()));
        };

        let slot = signal_registry::register(child.id(), [stdin.as_raw_fd(), stdout.as_raw_fd()]);
        debug!(pid = child.id(), "peer program started");

        Ok(ChildProcess {
            path: path.to_path_buf(),
            child,
            channel: Some(LineChannel::new(
                stdout,
                stdin,
                settings.max_chunk,
                settings.attempts,
            )),
            slot,
            released: false,
        })
    }

    /// Read one line written by the child.
    pub fn read_line(&mut self, timeout: Duration) -> Result<String, ProtocolError> {
        match &mut self.channel {
            Some(channel) => channel.read_line(timeout),
            None => Err(ProtocolError::PeerClosed),
        }
    }

    /// Send one line to the child.
    pub fn write_line(&mut self, text: &str) -> Result<(), ProtocolError> {
        match &mut self.channel {
            Some(channel) => channel.write_line(text),
            None => Err(ProtocolError::WriteError(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            ))),
        }
    }

    /// Kill and reap the child, then close its pipes.
    ///
    /// Safe to call any number of times. Failures are only logged.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let pid = self.child.id();
        let path = self.path.display();
        match self.child.try_wait() {
            Ok(Some(status)) => debug!(pid, %path, %status, "peer program already exited"),
            _ => {
                if let Err(e) = self.child.kill() {
                    warn!(pid, %path, "could not kill peer program: {e}");
                }
            }
        }
        match self.child.wait() {
            Ok(status) => debug!(pid, %path, %status, "peer program reaped"),
            Err(e) => warn!(pid, %path, "could not reap peer program: {e}"),
        }
        // only now is the pid free to be recycled
        if let Some(slot) = self.slot.take() {
            slot.clear();
        }
        // dropping the channel closes both pipes
        self.channel = None;
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: ChannelSettings = ChannelSettings {
        max_chunk: 200,
        attempts: 3,
    };

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = ChildProcess::spawn(Path::new("./no/such/program"), false, SETTINGS)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(err.to_string().contains("./no/such/program"));
    }

    #[test]
    fn non_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "not a program").unwrap();
        let err = ChildProcess::spawn(&path, false, SETTINGS).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn lines_round_trip_through_cat() {
        let mut child = ChildProcess::spawn(Path::new("/bin/cat"), false, SETTINGS).unwrap();
        child.write_line("4 2").unwrap();
        child.write_line("7 7 R").unwrap();
        assert_eq!(child.read_line(Duration::from_secs(2)).unwrap(), "4 2");
        assert_eq!(child.read_line(Duration::from_secs(2)).unwrap(), "7 7 R");
    }

    #[test]
    fn release_is_idempotent_and_closes_the_channel() {
        let mut child = ChildProcess::spawn(Path::new("/bin/cat"), false, SETTINGS).unwrap();
        child.release();
        child.release();
        assert!(matches!(
            child.read_line(Duration::from_millis(10)),
            Err(ProtocolError::PeerClosed)
        ));
        assert!(matches!(
            child.write_line("0 0"),
            Err(ProtocolError::WriteError(_))
        ));
        // drop releases a third time
    }

    #[test]
    fn child_stays_registered_until_reaped() {
        let mut child = ChildProcess::spawn(Path::new("/bin/cat"), false, SETTINGS).unwrap();
        let pid = child.child.id();
        assert!(signal_registry::is_registered(pid));

        child.release();
        assert!(!signal_registry::is_registered(pid));
        // reaped: nothing left to wait for
        assert!(child.child.try_wait().unwrap().is_some());
    }

    #[test]
    fn exited_child_reports_peer_closed() {
        let mut child = ChildProcess::spawn(Path::new("/bin/true"), false, SETTINGS).unwrap();
        assert!(matches!(
            child.read_line(Duration::from_secs(2)),
            Err(ProtocolError::PeerClosed)
        ));
    }
}
