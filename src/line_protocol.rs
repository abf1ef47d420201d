//! Newline-delimited messages over a pair of byte streams, with bounded waits.

use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{instrument, trace, warn};

/// Failure to exchange a line with a peer program.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    /// The peer did not finish a line in time.
    #[error("peer did not send a complete line in time")]
    Timeout,
    /// The peer closed its output or reading from it failed.
    #[error("peer closed the connection")]
    PeerClosed,
    /// The peer keeps sending data without ever ending the line.
    #[error("line sent by peer is too long")]
    LineTooLong,
    /// The line could not be delivered to the peer.
    #[error("could not write to peer: {0}")]
    WriteError(#[source] std::io::Error),
}

/// Buffered line reader/writer.
///
/// Bytes following a newline are kept for the next [`LineChannel::read_line`].
#[derive(Debug)]
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    buffer: Vec<u8>,
    max_chunk: usize,
    attempts: u32,
}

impl<R: Read + AsFd, W: Write> LineChannel<R, W> {
    /// Wrap a reader and a writer.
    ///
    /// * `max_chunk` - maximum bytes taken from `reader` at once.
    /// * `attempts` - waits/reads a line may take before [`LineChannel::read_line`] gives up.
    pub fn new(reader: R, writer: W, max_chunk: usize, attempts: u32) -> Self {
        Self {
            reader,
            writer,
            buffer: Vec::new(),
            max_chunk: max_chunk.max(1),
            attempts: attempts.max(1),
        }
    }

    /// Next line, without its delimiter (`\n` or `\r\n`).
    ///
    /// Each attempt either waits up to `timeout` for data and finds none, or reads one chunk.
    /// When the attempts run out without a newline the error is [`ProtocolError::LineTooLong`]
    /// if every attempt read data, [`ProtocolError::Timeout`] otherwise.
    #[instrument(skip(self), fields(buffered = self.buffer.len()))]
    pub fn read_line(&mut self, timeout: Duration) -> Result<String, ProtocolError> {
        let mut reads = 0;
        let mut used = 0;
        let mut chunk = vec![0; self.max_chunk];
        loop {
            if let Some(line) = self.take_line() {
                trace!(%line, "received");
                return Ok(line);
            }
            if used >= self.attempts {
                return Err(if reads == used {
                    ProtocolError::LineTooLong
                } else {
                    ProtocolError::Timeout
                });
            }

            match self.wait_readable(timeout) {
                Ok(true) => {}
                Ok(false) => {
                    used += 1;
                    continue;
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    warn!("poll on peer output failed: {e}");
                    return Err(ProtocolError::PeerClosed);
                }
            }

            match self.reader.read(&mut chunk) {
                Ok(0) => return Err(ProtocolError::PeerClosed),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    reads += 1;
                    used += 1;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("read from peer failed: {e}");
                    return Err(ProtocolError::PeerClosed);
                }
            }
        }
    }

    /// Write `text` followed by a newline.
    pub fn write_line(&mut self, text: &str) -> Result<(), ProtocolError> {
        let mut message = String::with_capacity(text.len() + 1);
        message.push_str(text);
        message.push('\n');
        self.writer
            .write_all(message.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(ProtocolError::WriteError)
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn wait_readable(&self, timeout: Duration) -> Result<bool, Errno> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.reader.as_fd(), PollFlags::POLLIN)];
        let ready = poll(&mut fds, PollTimeout::from(millis))?;
        Ok(ready > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    use super::*;

    /// A channel reading what the returned stream writes, and writing into it.
    fn channel(max_chunk: usize) -> (LineChannel<UnixStream, UnixStream>, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let writer = ours.try_clone().unwrap();
        (LineChannel::new(ours, writer, max_chunk, 3), theirs)
    }

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn keeps_remainder_for_next_call() {
        let (mut channel, mut peer) = channel(200);
        peer.write_all(b"1 2\r\n3 4\n5 ").unwrap();

        assert_eq!(channel.read_line(SHORT).unwrap(), "1 2");
        assert_eq!(channel.read_line(SHORT).unwrap(), "3 4");

        peer.write_all(b"6\n").unwrap();
        assert_eq!(channel.read_line(SHORT).unwrap(), "5 6");
    }

    #[test]
    fn silent_peer_times_out() {
        let (mut channel, _peer) = channel(200);
        let start = Instant::now();
        assert!(matches!(
            channel.read_line(SHORT),
            Err(ProtocolError::Timeout)
        ));
        assert!(start.elapsed() >= SHORT * 3);
    }

    #[test]
    fn partial_line_then_silence_times_out() {
        let (mut channel, mut peer) = channel(200);
        peer.write_all(b"4 ").unwrap();
        assert!(matches!(
            channel.read_line(SHORT),
            Err(ProtocolError::Timeout)
        ));
        // the partial data stays buffered
        peer.write_all(b"5\n").unwrap();
        assert_eq!(channel.read_line(SHORT).unwrap(), "4 5");
    }

    #[test]
    fn endless_line_is_too_long() {
        let (mut channel, mut peer) = channel(4);
        peer.write_all(&[b'x'; 64]).unwrap();
        assert!(matches!(
            channel.read_line(SHORT),
            Err(ProtocolError::LineTooLong)
        ));
    }

    #[test]
    fn closed_peer() {
        let (mut channel, peer) = channel(200);
        drop(peer);
        assert!(matches!(
            channel.read_line(SHORT),
            Err(ProtocolError::PeerClosed)
        ));
        assert!(matches!(
            channel.write_line("F"),
            Err(ProtocolError::WriteError(_))
        ));
    }

    #[test]
    fn write_appends_newline() {
        let (mut channel, mut peer) = channel(200);
        channel.write_line("W").unwrap();
        let mut buf = [0; 2];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"W\n");
    }
}
