// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! FreeBSD keyboard/mouse acquisition core.
//!
//! Unifies a handful of mutually incompatible FreeBSD input channels —
//! a libinput-style device-discovery library, the Linux-compatible
//! evdev record format, raw virtual-terminal scancodes, a cooked tty's
//! ANSI escape sequences, and the sysmouse packet protocol — into one
//! normalized, evdev-keyed event stream drained by a host application
//! on each poll cycle.
//!
//! See the module list below for the layout.

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod evdev;
pub mod event;
pub mod handler;
pub mod modifiers;
pub mod pointer;
pub mod queue;
pub mod scancode;
pub mod sysmouse;
pub mod termios;
pub mod tty_lexer;
pub mod vt_scancode;

pub use error::InputCoreError;
pub use event::{KeyEvent, MouseButton, MouseButtons, MouseEvent, MouseEventKind, Modifiers};
pub use handler::{Handler, HandlerStats};

/// Maximum number of input devices considered during evdev probing
/// (`/dev/input/event0` .. `event31`).
pub const MAX_INPUT_DEVICES: usize = 32;

/// Capacity of the keyboard event queue drained once per poll cycle.
pub const MAX_KEY_EVENTS: usize = 64;

/// Capacity of the mouse event queue drained once per poll cycle.
pub const MAX_MOUSE_EVENTS: usize = 64;
