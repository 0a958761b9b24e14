// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Public handler: wires channel selection, decoders, and event queues
//! into the `init`/`poll`/`drain`/`deinit` contract consumed by a host
//! application's event loop.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::time::Instant;

use log::info;

use crate::channel::{self, ChannelSelectorConfig, KeyboardMode, MouseMode};
use crate::dispatch::DispatchChannel;
use crate::event::{KeyEvent, MouseEvent};
use crate::evdev;
use crate::modifiers::ModifierTracker;
use crate::pointer::PointerState;
use crate::queue::EventQueue;
use crate::sysmouse::SysmouseDecoder;
use crate::termios::TermiosGuard;
use crate::tty_lexer::TtyLexer;
use crate::vt_scancode;
use crate::{MAX_KEY_EVENTS, MAX_MOUSE_EVENTS};

const READ_CHUNK: usize = 256;
const READ_LIMIT_PER_CYCLE: usize = 4096;

/// Running counters, separate from the event queues (which reset on
/// every `poll`): totals across the handler's lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandlerStats {
    pub key_events_decoded: u64,
    pub mouse_events_decoded: u64,
    pub key_events_dropped: u64,
    pub mouse_events_dropped: u64,
    pub keyboard_poll_count: u64,
    pub mouse_poll_count: u64,
}

/// The unified keyboard/mouse acquisition handler.
pub struct Handler {
    config: ChannelSelectorConfig,

    keyboard_mode: KeyboardMode,
    mouse_mode: MouseMode,

    dispatch: Option<DispatchChannel>,
    evdev_fd: Option<File>,
    vt_fd: Option<File>,
    tty_fd: Option<File>,
    termios_guard: Option<TermiosGuard>,
    tty_lexer: TtyLexer,

    sysmouse_fd: Option<File>,
    sysmouse_decoder: SysmouseDecoder,

    modifiers: ModifierTracker,
    pointer: PointerState,

    key_queue: EventQueue<KeyEvent>,
    mouse_queue: EventQueue<MouseEvent>,

    stats: HandlerStats,
    start: Instant,
}

impl Handler {
    /// Probe every channel in fallback order and construct a handler.
    /// Never fails: absence of every channel yields a handler that
    /// simply produces no events.
    pub fn init(screen_width: u32, screen_height: u32) -> Self {
        Self::init_with_config(ChannelSelectorConfig::new(screen_width, screen_height))
    }

    /// Same as `init`, but with an overridable device-path/dimension
    /// configuration (used by tests and by hosts that need non-default
    /// paths).
    pub fn init_with_config(config: ChannelSelectorConfig) -> Self {
        let pointer = PointerState::new(config.screen_width, config.screen_height);

        let mut dispatch = None;
        let mut evdev_fd = None;
        let mut vt_fd = None;
        let mut tty_fd = None;
        let mut termios_guard = None;
        let mut keyboard_mode = KeyboardMode::None;

        if let Some(channel) = DispatchChannel::init() {
            dispatch = Some(channel);
            keyboard_mode = KeyboardMode::DispatchLibrary;
        } else if let Some(fd) = channel::probe_evdev(&config) {
            evdev_fd = Some(fd);
            keyboard_mode = KeyboardMode::Evdev;
        } else if let Some(fd) = channel::probe_vt_keyboard(&config) {
            vt_fd = Some(fd);
            keyboard_mode = KeyboardMode::VtScancode;
        } else if let Some((fd, guard)) = channel::probe_tty_raw(&config) {
            tty_fd = Some(fd);
            termios_guard = Some(guard);
            keyboard_mode = KeyboardMode::TtyRaw;
        }

        // The dispatch-library channel, when active, already produces
        // pointer events; only fall back to sysmouse when it isn't.
        let (mouse_mode, sysmouse_fd) = if dispatch.is_some() {
            (MouseMode::DispatchLibraryPointer, None)
        } else if let Some(fd) = channel::probe_sysmouse(&config) {
            (MouseMode::Sysmouse, Some(fd))
        } else {
            (MouseMode::None, None)
        };

        if keyboard_mode == KeyboardMode::None && mouse_mode == MouseMode::None {
            log::warn!("no input channels available");
        }
        info!("keyboard channel: {keyboard_mode:?}, mouse channel: {mouse_mode:?}");

        Self {
            config,
            keyboard_mode,
            mouse_mode,
            dispatch,
            evdev_fd,
            vt_fd,
            tty_fd,
            termios_guard,
            tty_lexer: TtyLexer::new(),
            sysmouse_fd,
            sysmouse_decoder: SysmouseDecoder::new(),
            modifiers: ModifierTracker::new(),
            pointer,
            key_queue: EventQueue::with_capacity(MAX_KEY_EVENTS),
            mouse_queue: EventQueue::with_capacity(MAX_MOUSE_EVENTS),
            stats: HandlerStats::default(),
            start: Instant::now(),
        }
    }

    /// Which keyboard channel is currently active.
    pub fn active_keyboard_mode(&self) -> KeyboardMode {
        self.keyboard_mode
    }

    /// Which mouse channel is currently active.
    pub fn active_mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    /// Lifetime counters for decoded/dropped events and per-channel
    /// poll counts.
    pub fn stats(&self) -> &HandlerStats {
        &self.stats
    }

    /// Update clamp bounds and re-clamp the pointer.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.config.screen_width = width;
        self.config.screen_height = height;
        self.pointer.set_screen_size(width, height);
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Drive all active decoders for one cycle. Always returns `true`.
    pub fn poll(&mut self) -> bool {
        self.key_queue.reset();
        self.mouse_queue.reset();

        self.poll_keyboard();
        self.poll_mouse();

        let now = self.now_ms();
        self.tty_lexer.check_timeout(now, &mut self.modifiers, &mut self.key_queue);

        true
    }

    fn poll_keyboard(&mut self) {
        match self.keyboard_mode {
            KeyboardMode::None => {}
            KeyboardMode::DispatchLibrary => {
                if let Some(channel) = self.dispatch.as_mut() {
                    channel.poll(&mut self.modifiers, &mut self.pointer, &mut self.key_queue, &mut self.mouse_queue);
                    self.stats.keyboard_poll_count += 1;
                    self.stats.mouse_poll_count += 1;
                }
            }
            KeyboardMode::Evdev => {
                if let Some(fd) = self.evdev_fd.as_mut() {
                    let buf = read_available(fd);
                    evdev::decode_buffer(&buf, &mut self.modifiers, &mut self.key_queue);
                    self.stats.keyboard_poll_count += 1;
                }
            }
            KeyboardMode::VtScancode => {
                if let Some(fd) = self.vt_fd.as_mut() {
                    let buf = read_available(fd);
                    for byte in buf {
                        vt_scancode::decode_byte(byte, &mut self.modifiers, &mut self.key_queue);
                    }
                    self.stats.keyboard_poll_count += 1;
                }
            }
            KeyboardMode::TtyRaw => {
                if let Some(fd) = self.tty_fd.as_mut() {
                    let buf = read_available(fd);
                    let now = self.now_ms();
                    for byte in buf {
                        self.tty_lexer.feed_byte(byte, now, &mut self.modifiers, &mut self.key_queue);
                    }
                    self.stats.keyboard_poll_count += 1;
                }
            }
        }
    }

    fn poll_mouse(&mut self) {
        if self.mouse_mode != MouseMode::Sysmouse {
            return;
        }
        let Some(fd) = self.sysmouse_fd.as_mut() else { return };
        let buf = read_available(fd);
        let mut out = Vec::new();
        for byte in buf {
            self.sysmouse_decoder.feed_byte(byte, &mut self.pointer, &mut out);
        }
        for event in out {
            self.mouse_queue.push(event);
        }
        self.stats.mouse_poll_count += 1;
    }

    /// Return buffered key events and empty the queue.
    pub fn drain_key_events(&mut self) -> Vec<KeyEvent> {
        let before_dropped = self.key_queue.dropped_count();
        let drained = self.key_queue.drain();
        self.stats.key_events_decoded += drained.len() as u64;
        self.stats.key_events_dropped += self.key_queue.dropped_count() - before_dropped;
        drained
    }

    /// Return buffered mouse events and empty the queue.
    pub fn drain_mouse_events(&mut self) -> Vec<MouseEvent> {
        let before_dropped = self.mouse_queue.dropped_count();
        let drained = self.mouse_queue.drain();
        self.stats.mouse_events_decoded += drained.len() as u64;
        self.stats.mouse_events_dropped += self.mouse_queue.dropped_count() - before_dropped;
        drained
    }

    /// Restore saved termios, close descriptors. Safe to call more
    /// than once.
    pub fn deinit(&mut self) {
        self.termios_guard = None; // Drop restores termios.
        self.dispatch = None;
        self.evdev_fd = None;
        self.vt_fd = None;
        self.tty_fd = None;
        self.sysmouse_fd = None;
        self.keyboard_mode = KeyboardMode::None;
        self.mouse_mode = MouseMode::None;
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn read_available(file: &mut File) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        if out.len() >= READ_LIMIT_PER_CYCLE {
            break;
        }
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(_) => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_with_no_channels_available_is_idle_not_panicking() {
        let mut config = ChannelSelectorConfig::new(320, 240);
        config.evdev_device_count = 0;
        config.vt_keyboard_devices.clear();
        config.tty_devices.clear();
        config.sysmouse_device = std::path::PathBuf::from("/nonexistent/sysmouse-for-tests");

        let mut handler = Handler::init_with_config(config);
        assert_eq!(handler.active_keyboard_mode(), KeyboardMode::None);
        assert_eq!(handler.active_mouse_mode(), MouseMode::None);
        assert!(handler.poll());
        assert!(handler.drain_key_events().is_empty());
        assert!(handler.drain_mouse_events().is_empty());
    }

    #[test]
    fn stats_are_not_reset_by_poll_or_drain() {
        let mut config = ChannelSelectorConfig::new(320, 240);
        config.evdev_device_count = 0;
        config.vt_keyboard_devices.clear();
        config.tty_devices.clear();
        config.sysmouse_device = std::path::PathBuf::from("/nonexistent/sysmouse-for-tests");
        let mut handler = Handler::init_with_config(config);

        handler.key_queue.push(KeyEvent { key_code: 1, modifiers: Default::default(), pressed: true });
        handler.drain_key_events();
        assert_eq!(handler.stats().key_events_decoded, 1);

        handler.poll();
        handler.drain_key_events();
        assert_eq!(handler.stats().key_events_decoded, 1);
    }

    #[test]
    fn deinit_is_idempotent() {
        let mut config = ChannelSelectorConfig::new(320, 240);
        config.evdev_device_count = 0;
        config.vt_keyboard_devices.clear();
        config.tty_devices.clear();
        config.sysmouse_device = std::path::PathBuf::from("/nonexistent/sysmouse-for-tests");
        let mut handler = Handler::init_with_config(config);
        handler.deinit();
        handler.deinit();
        assert_eq!(handler.active_keyboard_mode(), KeyboardMode::None);
    }
}
