// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal raw-mode acquisition and scoped restoration.
//!
//! A real guard and a stub guard share one name, selected by
//! `cfg(unix)` and re-exported under a single `TermiosGuard`: the real
//! termios manipulation only makes sense on POSIX targets, so a stub
//! is provided for any build that lacks termios semantics.

use crate::error::InputCoreError;

#[cfg(unix)]
use std::os::unix::io::RawFd;

#[cfg(not(unix))]
type RawFd = i32;

#[cfg(unix)]
pub use unix_termios::TermiosGuard;

#[cfg(not(unix))]
pub use stub_termios::TermiosGuard;

#[cfg(unix)]
mod unix_termios {
    use super::*;
    use log::warn;

    /// Owns a saved `termios` record for one open file descriptor and
    /// restores it on drop. Construction applies true-raw mode
    /// immediately; if the raw-mode ioctl fails the descriptor is left
    /// untouched and the guard restores nothing.
    pub struct TermiosGuard {
        fd: RawFd,
        saved: Option<libc::termios>,
    }

    impl TermiosGuard {
        /// Save the current termios for `fd`, then apply true-raw
        /// mode: clear `IGNBRK|BRKINT|PARMRK|ISTRIP|INLCR|IGNCR|ICRNL|IXON`
        /// on input, `OPOST` on output, `ECHO|ECHONL|ICANON|ISIG|IEXTEN`
        /// locally, set `CS8` with parity cleared, and `VMIN=0,VTIME=0`
        /// for non-blocking reads.
        pub fn apply(fd: RawFd) -> std::io::Result<Self> {
            let original = unsafe {
                let mut term: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(fd, &mut term) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                term
            };

            let mut raw = original;
            raw.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            raw.c_oflag &= !libc::OPOST;
            raw.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            raw.c_cflag &= !(libc::CSIZE | libc::PARENB);
            raw.c_cflag |= libc::CS8;
            raw.c_cc[libc::VMIN] = 0;
            raw.c_cc[libc::VTIME] = 0;

            unsafe {
                if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                libc::tcflush(fd, libc::TCIFLUSH);
            }

            Ok(Self { fd, saved: Some(original) })
        }

        /// Restore the saved termios now, rather than waiting for drop.
        /// Idempotent: a second call is a no-op.
        pub fn restore(&mut self) -> Result<(), InputCoreError> {
            let Some(saved) = self.saved.take() else {
                return Ok(());
            };
            let ok = unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &saved) == 0 };
            if ok {
                Ok(())
            } else {
                Err(InputCoreError::TerminalStateUnrestorable(std::io::Error::last_os_error()))
            }
        }
    }

    impl Drop for TermiosGuard {
        fn drop(&mut self) {
            if let Err(err) = self.restore() {
                warn!("failed to restore terminal state: {err}");
            }
        }
    }
}

#[cfg(not(unix))]
mod stub_termios {
    use super::*;

    /// Non-Unix targets have no termios to save or restore; this is a
    /// structural stand-in so `channel.rs` compiles everywhere without
    /// conditional module wiring at every call site.
    pub struct TermiosGuard;

    impl TermiosGuard {
        pub fn apply(_fd: RawFd) -> std::io::Result<Self> {
            Ok(Self)
        }

        pub fn restore(&mut self) -> Result<(), InputCoreError> {
            Ok(())
        }
    }
}
