// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal byte-stream escape-sequence lexer.
//!
//! The most intricate keyboard path: a cooked tty collapses distinct
//! key presses (arrows, function keys, Alt-combinations) into ANSI
//! escape sequences that must be re-lexed one byte at a time, with a
//! 50ms inter-byte timeout distinguishing a real sequence from a bare
//! Escape press followed by ordinary typing.
//!
//! `now_ms` is threaded through explicitly rather than read from a
//! wall clock internally: duration arithmetic over an injected
//! timestamp, not `Instant::now()` buried in the decoder, is what
//! makes the timeout behavior unit-testable without sleeping a test
//! thread.

use crate::event::{KeyEvent, Modifiers};
use crate::modifiers::ModifierTracker;
use crate::queue::EventQueue;
use crate::scancode::ascii_to_evdev;

const ESC: u8 = 0x1B;
const ESCAPE_EVDEV: u32 = 1;
const TIMEOUT_MS: u64 = 50;
const BUF_CAP: usize = 16;

/// Byte-at-a-time lexer state for one keyboard channel.
#[derive(Debug)]
pub struct TtyLexer {
    buf: [u8; BUF_CAP],
    len: usize,
    timeout_anchor_ms: u64,
}

impl Default for TtyLexer {
    fn default() -> Self {
        Self { buf: [0; BUF_CAP], len: 0, timeout_anchor_ms: 0 }
    }
}

impl TtyLexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the buffer currently holds a pending escape sequence.
    pub fn is_pending(&self) -> bool {
        self.len > 0
    }

    fn reset(&mut self) {
        self.len = 0;
    }

    fn push_buf(&mut self, byte: u8) {
        if self.len < BUF_CAP {
            self.buf[self.len] = byte;
            self.len += 1;
        }
        // Buffer full: drop the byte.
    }

    /// Feed one byte read from the terminal device.
    pub fn feed_byte(
        &mut self,
        byte: u8,
        now_ms: u64,
        modifiers: &mut ModifierTracker,
        queue: &mut EventQueue<KeyEvent>,
    ) {
        if self.len == 0 {
            if byte == ESC {
                self.buf[0] = ESC;
                self.len = 1;
                self.timeout_anchor_ms = now_ms;
                return;
            }
            emit_ascii(byte, modifiers, queue);
            return;
        }

        if now_ms.saturating_sub(self.timeout_anchor_ms) > TIMEOUT_MS {
            emit_bare_escape(modifiers, queue);
            self.reset();
            self.feed_byte(byte, now_ms, modifiers, queue);
            return;
        }

        self.push_buf(byte);
        self.try_recognize(modifiers, queue);
    }

    /// Called at the end of each poll cycle: if the buffer holds only
    /// the opening `ESC` and the timeout has elapsed, emit a bare
    /// Escape press.
    pub fn check_timeout(&mut self, now_ms: u64, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
        if self.len == 1 && now_ms.saturating_sub(self.timeout_anchor_ms) > TIMEOUT_MS {
            emit_bare_escape(modifiers, queue);
            self.reset();
        }
    }

    fn try_recognize(&mut self, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
        if self.len < 2 {
            return;
        }
        let second = self.buf[1];

        if second == b'[' {
            if self.len < 3 {
                return;
            }
            let final_byte = self.buf[self.len - 1];
            if (0x40..=0x7E).contains(&final_byte) {
                self.handle_csi(final_byte, modifiers, queue);
                self.reset();
            }
            return;
        }

        if second == b'O' {
            if self.len < 3 {
                return;
            }
            let third = self.buf[2];
            if let Some(code) = function_key(third) {
                emit_press(code, Modifiers::empty(), modifiers, queue);
            }
            self.reset();
            return;
        }

        // ESC x (x >= 0x20): Alt+x, no CSI/SS3 prefix recognized.
        if second >= 0x20 {
            if let Some(t) = ascii_to_evdev(second) {
                let mut transient = Modifiers::ALT;
                if t.shift {
                    transient |= Modifiers::SHIFT;
                }
                emit_press(t.evdev_code, transient, modifiers, queue);
            }
            self.reset();
            return;
        }

        // Second byte doesn't start a recognized prefix and isn't
        // printable: stay in escape state awaiting more bytes or timeout.
    }

    fn handle_csi(&self, final_byte: u8, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
        if self.len == 3 {
            if let Some(code) = csi_final(final_byte) {
                emit_press(code, Modifiers::empty(), modifiers, queue);
            }
            return;
        }
        if self.len == 4 && final_byte == b'~' {
            if let Some(code) = csi_tilde(self.buf[2]) {
                emit_press(code, Modifiers::empty(), modifiers, queue);
            }
            return;
        }
        // Valid final byte but an unrecognized form: silently consume.
    }
}

fn csi_final(final_byte: u8) -> Option<u32> {
    match final_byte {
        b'A' => Some(103), // Up
        b'B' => Some(108), // Down
        b'C' => Some(106), // Right
        b'D' => Some(105), // Left
        b'H' => Some(102), // Home
        b'F' => Some(107), // End
        _ => None,
    }
}

fn csi_tilde(n: u8) -> Option<u32> {
    match n {
        b'1' => Some(102), // Home
        b'2' => Some(110), // Insert
        b'3' => Some(111), // Delete
        b'4' => Some(107), // End
        b'5' => Some(104), // PgUp
        b'6' => Some(109), // PgDn
        _ => None,
    }
}

fn function_key(third: u8) -> Option<u32> {
    match third {
        b'P' => Some(59), // F1
        b'Q' => Some(60), // F2
        b'R' => Some(61), // F3
        b'S' => Some(62), // F4
        _ => None,
    }
}

fn emit_bare_escape(modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
    emit_press(ESCAPE_EVDEV, Modifiers::empty(), modifiers, queue);
}

fn emit_press(evdev_code: u32, transient: Modifiers, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
    modifiers.with_transient(transient, |bits| {
        queue.push(KeyEvent { key_code: evdev_code, modifiers: bits, pressed: true });
    });
}

fn emit_ascii(byte: u8, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
    let Some(t) = ascii_to_evdev(byte) else { return };
    let mut transient = Modifiers::empty();
    if t.shift {
        transient |= Modifiers::SHIFT;
    }
    if t.ctrl {
        transient |= Modifiers::CTRL;
    }
    emit_press(t.evdev_code, transient, modifiers, queue);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csi_up_arrow_sequence() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        for b in [0x1B, 0x5B, 0x41] {
            lexer.feed_byte(b, 0, &mut modifiers, &mut queue);
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key_code, 103);
        assert!(drained[0].pressed);
    }

    #[test]
    fn bare_escape_on_timeout() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        lexer.feed_byte(0x1B, 0, &mut modifiers, &mut queue);
        assert!(queue.is_empty());
        lexer.check_timeout(60, &mut modifiers, &mut queue);
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key_code, 1);
    }

    #[test]
    fn uppercase_shift_is_transient() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        lexer.feed_byte(b'A', 0, &mut modifiers, &mut queue);
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key_code, 30);
        assert!(drained[0].modifiers.contains(Modifiers::SHIFT));
        assert!(!modifiers.bits().contains(Modifiers::SHIFT));
    }

    #[test]
    fn function_key_f1() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        for b in [0x1B, b'O', b'P'] {
            lexer.feed_byte(b, 0, &mut modifiers, &mut queue);
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key_code, 59);
    }

    #[test]
    fn tilde_form_delete_key() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        for b in [0x1B, b'[', b'3', b'~'] {
            lexer.feed_byte(b, 0, &mut modifiers, &mut queue);
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key_code, 111);
    }

    #[test]
    fn unrecognized_csi_form_silently_consumed() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        for b in [0x1B, b'[', b'9', b'9', b'm'] {
            lexer.feed_byte(b, 0, &mut modifiers, &mut queue);
        }
        assert!(queue.is_empty());
        assert!(!lexer.is_pending());
    }

    #[test]
    fn alt_prefixed_character() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        for b in [0x1B, b'x'] {
            lexer.feed_byte(b, 0, &mut modifiers, &mut queue);
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].modifiers.contains(Modifiers::ALT));
    }

    #[test]
    fn timeout_then_fresh_byte_reprocessed() {
        let mut lexer = TtyLexer::new();
        let mut modifiers = ModifierTracker::new();
        let mut queue = EventQueue::with_capacity(8);
        lexer.feed_byte(0x1B, 0, &mut modifiers, &mut queue);
        // 'a' arrives 60ms later, past the 50ms timeout.
        lexer.feed_byte(b'a', 60, &mut modifiers, &mut queue);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].key_code, 1); // bare ESC
        assert_eq!(drained[1].key_code, 30); // 'a'
    }
}
