// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Channel probing and selection.
//!
//! Backends are kept in a side table and only a small tag enum tracks
//! which one is active, rather than wrapping each backend's resources
//! inside the active-mode enum itself. `KeyboardMode`/`MouseMode` are
//! plain tags; the descriptors and guards they refer to live alongside
//! them in `handler.rs`, not inside the enum — this keeps the enum
//! `Copy` and avoids an owning-enum-variant-holds-a-resource shape for
//! what is otherwise a fixed, closed set of channels.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use log::{debug, warn};

use crate::termios::TermiosGuard;

/// Which keyboard channel is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardMode {
    None,
    DispatchLibrary,
    Evdev,
    VtScancode,
    TtyRaw,
}

/// Which mouse channel is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    None,
    Sysmouse,
    DispatchLibraryPointer,
}

/// Overridable device-path candidates and screen dimensions, so tests
/// can substitute temp-file paths without touching `/dev`. `Default`
/// reproduces the standard FreeBSD device paths.
#[derive(Debug, Clone)]
pub struct ChannelSelectorConfig {
    pub evdev_dir: PathBuf,
    pub evdev_device_count: usize,
    pub vt_keyboard_devices: Vec<PathBuf>,
    pub tty_devices: Vec<PathBuf>,
    pub sysmouse_device: PathBuf,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ChannelSelectorConfig {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            screen_width,
            screen_height,
            ..Self::default()
        }
    }

    fn evdev_path(&self, index: usize) -> PathBuf {
        self.evdev_dir.join(format!("event{index}"))
    }
}

impl Default for ChannelSelectorConfig {
    fn default() -> Self {
        Self {
            evdev_dir: PathBuf::from("/dev/input"),
            evdev_device_count: crate::MAX_INPUT_DEVICES,
            vt_keyboard_devices: ["/dev/kbdmux0", "/dev/ukbd0", "/dev/atkbd0", "/dev/kbd0"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            tty_devices: ["/dev/ttyv0", "/dev/ttyv1", "/dev/ttyv2", "/dev/tty"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            sysmouse_device: PathBuf::from("/dev/sysmouse"),
            screen_width: 640,
            screen_height: 480,
        }
    }
}

fn open_nonblocking(path: &std::path::Path, write: bool) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).custom_flags(libc::O_NONBLOCK);
    if write {
        opts.write(true);
    }
    opts.open(path)
}

/// Open the first evdev device under `config.evdev_dir` that supports
/// key events and has a keyboard-shaped key-capability bitmap (either
/// Q+W or A+Space present).
pub fn probe_evdev(config: &ChannelSelectorConfig) -> Option<File> {
    for index in 0..config.evdev_device_count {
        let path = config.evdev_path(index);
        debug!("probing evdev device {path:?}");
        let file = match open_nonblocking(&path, false) {
            Ok(f) => f,
            Err(_) => continue,
        };
        if supports_keyboard(&file) {
            return Some(file);
        }
    }
    None
}

fn supports_keyboard(file: &File) -> bool {
    const EV_KEY: u32 = 0x01;
    const KEY_Q: usize = 16;
    const KEY_W: usize = 17;
    const KEY_A: usize = 30;
    const KEY_SPACE: usize = 57;

    let Some(ev_bits) = ioctl_eviocgbit(file, 0, 4) else { return false };
    if !bit_set(&ev_bits, EV_KEY as usize) {
        return false;
    }
    let Some(key_bits) = ioctl_eviocgbit(file, EV_KEY, 96) else { return false };
    (bit_set(&key_bits, KEY_Q) && bit_set(&key_bits, KEY_W))
        || (bit_set(&key_bits, KEY_A) && bit_set(&key_bits, KEY_SPACE))
}

fn bit_set(bitmap: &[u8], bit: usize) -> bool {
    let byte = bit / 8;
    let shift = bit % 8;
    bitmap.get(byte).is_some_and(|b| b & (1 << shift) != 0)
}

/// `EVIOCGBIT(ev, len)` ioctl, FreeBSD's evdev compat layer mirrors
/// the Linux request number layout. Returns `None` on ioctl failure
/// (rejects the device as "not a keyboard").
fn ioctl_eviocgbit(file: &File, ev: u32, len: usize) -> Option<Vec<u8>> {
    const IOC_READ: u32 = 2;
    const NRSHIFT: u32 = 0;
    const TYPESHIFT: u32 = NRSHIFT + 8;
    const SIZESHIFT: u32 = TYPESHIFT + 8;
    const DIRSHIFT: u32 = SIZESHIFT + 14;

    let request = ((IOC_READ as u64) << DIRSHIFT)
        | ((b'E' as u64) << TYPESHIFT)
        | (((0x20 + ev) as u64) << NRSHIFT)
        | ((len as u64) << SIZESHIFT);

    let mut buf = vec![0u8; len];
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), request as libc::c_ulong, buf.as_mut_ptr()) };
    if ret < 0 {
        None
    } else {
        Some(buf)
    }
}

/// Open the first openable VT keyboard device. Never alters console
/// keyboard mode system-wide (explicit design decision: doing so would
/// affect other virtual terminals).
pub fn probe_vt_keyboard(config: &ChannelSelectorConfig) -> Option<File> {
    for path in &config.vt_keyboard_devices {
        debug!("probing VT keyboard device {path:?}");
        if let Ok(file) = open_nonblocking(path, false) {
            return Some(file);
        }
    }
    None
}

/// Open the first TTY device and apply true-raw termios.
pub fn probe_tty_raw(config: &ChannelSelectorConfig) -> Option<(File, TermiosGuard)> {
    for path in &config.tty_devices {
        debug!("probing TTY device {path:?}");
        let Ok(file) = open_nonblocking(path, true) else { continue };
        match TermiosGuard::apply(file.as_raw_fd()) {
            Ok(guard) => return Some((file, guard)),
            Err(err) => {
                warn!("failed to apply raw mode to {path:?}: {err}");
                continue;
            }
        }
    }
    None
}

/// Open `/dev/sysmouse` non-blocking read-only. Absence is tolerated
/// with a warning.
pub fn probe_sysmouse(config: &ChannelSelectorConfig) -> Option<File> {
    debug!("probing sysmouse device {:?}", config.sysmouse_device);
    match open_nonblocking(&config.sysmouse_device, false) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!("sysmouse unavailable at {:?}: {err}", config.sysmouse_device);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_freebsd_device_paths() {
        let config = ChannelSelectorConfig::default();
        assert_eq!(config.sysmouse_device, PathBuf::from("/dev/sysmouse"));
        assert_eq!(
            config.vt_keyboard_devices,
            vec![
                PathBuf::from("/dev/kbdmux0"),
                PathBuf::from("/dev/ukbd0"),
                PathBuf::from("/dev/atkbd0"),
                PathBuf::from("/dev/kbd0"),
            ]
        );
        assert_eq!(
            config.tty_devices,
            vec![
                PathBuf::from("/dev/ttyv0"),
                PathBuf::from("/dev/ttyv1"),
                PathBuf::from("/dev/ttyv2"),
                PathBuf::from("/dev/tty"),
            ]
        );
    }

    #[test]
    fn evdev_path_joins_index() {
        let config = ChannelSelectorConfig::default();
        assert_eq!(config.evdev_path(3), PathBuf::from("/dev/input/event3"));
    }

    #[test]
    fn bit_set_checks_correct_byte_and_shift() {
        let bitmap = [0b0000_0010u8];
        assert!(bit_set(&bitmap, 1));
        assert!(!bit_set(&bitmap, 0));
        assert!(!bit_set(&bitmap, 16)); // out of range
    }

    #[test]
    fn missing_devices_yield_none_without_panicking() {
        let mut config = ChannelSelectorConfig::default();
        config.sysmouse_device = PathBuf::from("/nonexistent/sysmouse-for-tests");
        assert!(probe_sysmouse(&config).is_none());

        config.vt_keyboard_devices = vec![PathBuf::from("/nonexistent/kbd-for-tests")];
        assert!(probe_vt_keyboard(&config).is_none());
    }
}
