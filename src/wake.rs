//! Readiness signal (C8): a Unix self-pipe exposing `receive_from`'s
//! pending-message count as a pollable file descriptor, so a caller
//! driving its own `select`/`epoll` loop over several sockets can wait
//! on this one without busy-polling `receive_from`.
//!
//! Grounded on the teacher's `UdpSocketWrapper`, which likewise wraps
//! a raw OS handle in a small struct with its own invariants; the
//! self-pipe plumbing itself (`nix`'s pipe/fcntl/read/write) has no
//! counterpart in the teacher, since its tick-based design never
//! exposes a pollable fd at all.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Mutex;

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd::{close, pipe, read, write};

fn nix_to_io(err: nix::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

const TOKEN: u8 = b'W';

/// A counting readiness signal backed by a self-pipe. `value` tracks
/// how many messages are queued for `receive_from` but not yet
/// dequeued (invariant I6: `value >= 0` always). The pipe itself only
/// ever carries a single byte: [`WakeSignal::notify_write`] writes it
/// on the 0-to-1 transition, [`WakeSignal::notify_read`] consumes it
/// on the 1-to-0 transition, so the fd reads as readable exactly when
/// `value > 0`.
#[derive(Debug)]
pub(crate) struct WakeSignal {
    read_fd: RawFd,
    write_fd: RawFd,
    value: Mutex<u64>,
}

impl WakeSignal {
    pub(crate) fn new() -> io::Result<Self> {
        let (read_fd, write_fd) = pipe().map_err(nix_to_io)?;
        for fd in [read_fd, write_fd] {
            let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(nix_to_io)?;
            let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
            fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(nix_to_io)?;
        }
        Ok(WakeSignal { read_fd, write_fd, value: Mutex::new(0) })
    }

    /// The descriptor a caller can register with its own poller.
    pub(crate) fn fileno(&self) -> RawFd {
        self.read_fd
    }

    /// Called by the receive worker once a reassembled message is
    /// pushed onto the inbound queue.
    pub(crate) fn notify_write(&self) {
        let mut value = self.value.lock().unwrap();
        *value += 1;
        if *value == 1 {
            let _ = write(self.write_fd, &[TOKEN]);
        }
    }

    /// Called by `receive_from` once it has dequeued one message.
    pub(crate) fn notify_read(&self) {
        let mut value = self.value.lock().unwrap();
        debug_assert!(*value > 0, "notify_read called with no pending message");
        *value = value.saturating_sub(1);
        if *value == 0 {
            let mut buf = [0u8; 1];
            let _ = read(self.read_fd, &mut buf);
        }
    }
}

impl Drop for WakeSignal {
    fn drop(&mut self) {
        let _ = close(self.read_fd);
        let _ = close(self.write_fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_pipe_byte_only_on_zero_to_one_transition() {
        let signal = WakeSignal::new().unwrap();
        signal.notify_write();
        signal.notify_write();
        signal.notify_write();
        assert_eq!(*signal.value.lock().unwrap(), 3);
    }

    #[test]
    fn drains_pipe_byte_only_on_one_to_zero_transition() {
        let signal = WakeSignal::new().unwrap();
        signal.notify_write();
        signal.notify_write();
        signal.notify_read();
        assert_eq!(*signal.value.lock().unwrap(), 1);
        signal.notify_read();
        assert_eq!(*signal.value.lock().unwrap(), 0);
    }
}
