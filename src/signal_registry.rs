//! Process-wide table of running peer programs, used to kill them when the referee is
//! interrupted.
//!
//! The table is a fixed array of atomics: entries are claimed when a child is spawned and
//! cleared when it is released. The interrupt handler only loads atomics and calls `kill`,
//! `close` and `_exit`, which are all safe to call from a signal handler.

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::exit_codes;

/// Maximum number of children tracked at the same time.
pub const CAPACITY: usize = 16;
/// Descriptors tracked per child (its stdin and stdout).
pub const FDS_PER_CHILD: usize = 2;

const FREE: i32 = 0;
const NO_FD: i32 = -1;

struct Entry {
    pid: AtomicI32,
    fds: [AtomicI32; FDS_PER_CHILD],
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_FD: AtomicI32 = AtomicI32::new(NO_FD);
#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_ENTRY: Entry = Entry {
    pid: AtomicI32::new(FREE),
    fds: [EMPTY_FD; FDS_PER_CHILD],
};

static ENTRIES: [Entry; CAPACITY] = [EMPTY_ENTRY; CAPACITY];

/// A claimed registry entry. Clearing it forgets the child.
#[derive(Debug)]
pub struct Slot {
    index: usize,
}

/// Record a freshly spawned child and its descriptors.
///
/// Returns `None` when the table is full; the child then simply won't be killed on interrupt.
pub fn register(pid: u32, fds: [RawFd; FDS_PER_CHILD]) -> Option<Slot> {
    let Ok(pid) = i32::try_from(pid) else {
        warn!(pid, "pid does not fit the registry");
        return None;
    };
    for (index, entry) in ENTRIES.iter().enumerate() {
        // fds are published before the pid is visible to the handler's loop
        if entry
            .pid
            .compare_exchange(FREE, -pid, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            for (slot, fd) in entry.fds.iter().zip(fds) {
                slot.store(fd, Ordering::Release);
            }
            entry.pid.store(pid, Ordering::Release);
            debug!(pid, index, "registered child");
            return Some(Slot { index });
        }
    }
    warn!(pid, "signal registry is full, child won't be killed on interrupt");
    None
}

impl Slot {
    /// Forget the child: its pid may be recycled and its descriptors reused from now on.
    pub fn clear(self) {
        let entry = &ENTRIES[self.index];
        for fd in &entry.fds {
            fd.store(NO_FD, Ordering::Release);
        }
        entry.pid.store(FREE, Ordering::Release);
    }
}

/// True while `pid` holds a slot.
#[cfg(test)]
pub(crate) fn is_registered(pid: u32) -> bool {
    i32::try_from(pid).is_ok_and(|pid| {
        ENTRIES
            .iter()
            .any(|e| e.pid.load(Ordering::Acquire) == pid)
    })
}

/// Install the emergency handler for SIGINT, SIGTERM and SIGHUP.
pub fn install_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only touches atomics and async-signal-safe libc calls.
        unsafe { signal::sigaction(sig, &action) }?;
    }
    Ok(())
}

extern "C" fn handle_interrupt(_signal: libc::c_int) {
    kill_all();
    // SAFETY: _exit is async-signal-safe and never returns.
    unsafe { libc::_exit(exit_codes::INTERRUPTED) }
}

/// Kill every registered child and close its descriptors.
fn kill_all() {
    for entry in &ENTRIES {
        let pid = entry.pid.load(Ordering::Acquire);
        if pid > 0 {
            let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
        if pid != FREE {
            for fd in &entry.fds {
                let fd = fd.swap(NO_FD, Ordering::AcqRel);
                if fd >= 0 {
                    // SAFETY: the descriptor belongs to a registered child pipe, and the process
                    // exits right after.
                    unsafe { libc::close(fd) };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(pid: i32) -> Option<usize> {
        ENTRIES
            .iter()
            .position(|e| e.pid.load(Ordering::Acquire) == pid)
    }

    #[test]
    fn register_then_clear() {
        // pids far above pid_max so nothing real is ever addressed
        let pid = 0x3fff_fff0;
        let slot = register(pid as u32, [1000, 1001]).unwrap();
        let index = find(pid).unwrap();
        assert_eq!(index, slot.index);
        assert_eq!(ENTRIES[index].fds[0].load(Ordering::Acquire), 1000);
        assert_eq!(ENTRIES[index].fds[1].load(Ordering::Acquire), 1001);

        slot.clear();
        assert_eq!(find(pid), None);
        assert_eq!(ENTRIES[index].fds[0].load(Ordering::Acquire), NO_FD);
    }

    #[test]
    fn oversized_pid_is_not_registered() {
        assert!(register(u32::MAX, [1, 2]).is_none());
    }
}
