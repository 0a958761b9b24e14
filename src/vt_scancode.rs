// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Virtual-terminal raw scancode reader.
//!
//! A single status bit on the byte itself carries press/release
//! instead of a separate field.

use crate::event::KeyEvent;
use crate::modifiers::ModifierTracker;
use crate::queue::EventQueue;
use crate::scancode::at_set1_to_evdev;

const RELEASE_BIT: u8 = 0x80;

/// Decode one raw AT set-1 byte read from an opened VT keyboard
/// device. Drops the byte silently if it does not map to a known
/// evdev code.
pub fn decode_byte(byte: u8, modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
    let released = byte & RELEASE_BIT != 0;
    let code = byte & !RELEASE_BIT;

    let Some(evdev_code) = at_set1_to_evdev(code) else {
        return;
    };

    let pressed = !released;
    modifiers.on_key(evdev_code, pressed);
    queue.push(KeyEvent {
        key_code: evdev_code,
        modifiers: modifiers.bits(),
        pressed,
    });
}
