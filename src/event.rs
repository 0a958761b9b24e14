// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Normalized event types shared by every decoder.

bitflags::bitflags! {
    /// Modifier bitset, keyed the same way across every keyboard
    /// channel regardless of how that channel encodes modifiers on the
    /// wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0x01;
        const ALT   = 0x02;
        const CTRL  = 0x04;
        const META  = 0x08;
    }
}

/// A single keyboard press or release, normalized to evdev numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Linux evdev key code.
    pub key_code: u32,
    /// Modifier state at the time of this event.
    pub modifiers: Modifiers,
    /// `true` for press, `false` for release.
    pub pressed: bool,
}

/// Mouse button identifier, limited to the three sysmouse/libinput
/// buttons this core normalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

bitflags::bitflags! {
    /// Tracked physical button state, mirroring the last-known sysmouse
    /// or dispatch-library report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0x01;
        const MIDDLE = 0x02;
        const RIGHT  = 0x04;
    }
}

impl MouseButtons {
    /// Bit for a given logical button.
    pub(crate) fn bit(button: MouseButton) -> MouseButtons {
        match button {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Right => MouseButtons::RIGHT,
        }
    }
}

/// What kind of mouse event this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

/// A single mouse event in host screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// X coordinate, clamped to `[0, width)`.
    pub x: i32,
    /// Y coordinate, clamped to `[0, height)`.
    pub y: i32,
    /// Button this event pertains to. Ignored by consumers for
    /// `Motion` events (set to `Left` by convention).
    pub button: MouseButton,
    pub kind: MouseEventKind,
    pub modifiers: Modifiers,
}
