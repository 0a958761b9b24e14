// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Device-discovery library adapter.
//!
//! Preferred over every other keyboard/mouse channel because it keeps
//! working with the console in graphics (KMS/DRM) mode. Gated behind
//! the `libinput` Cargo feature: a real adapter module and a stub
//! module share one name, selected by `cfg(feature = "libinput")`
//! rather than `cfg(target_os)`, since libinput availability is a
//! build-time choice, not a platform one.

use crate::event::{KeyEvent, MouseButton, MouseButtons, MouseEvent, MouseEventKind, Modifiers};
use crate::modifiers::ModifierTracker;
use crate::pointer::PointerState;
use crate::queue::EventQueue;

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;

/// Whether this build was compiled with the `libinput` feature and
/// can therefore offer the `DispatchLibrary` keyboard/mouse mode.
pub fn is_available() -> bool {
    cfg!(feature = "libinput")
}

#[cfg(feature = "libinput")]
pub use real_dispatch::DispatchChannel;

#[cfg(not(feature = "libinput"))]
pub use stub_dispatch::DispatchChannel;

#[cfg(feature = "libinput")]
mod real_dispatch {
    use super::*;
    use input::event::keyboard::{KeyState, KeyboardEventTrait};
    use input::event::pointer::{Axis, ButtonState, PointerEventTrait};
    use input::event::{Event, PointerEvent};
    use input::{Libinput, LibinputInterface};
    use log::{info, warn};
    use std::fs::{File, OpenOptions};
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::OwnedFd;
    use std::path::Path;

    struct Interface;

    impl LibinputInterface for Interface {
        fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32> {
            OpenOptions::new()
                .custom_flags(flags)
                .read(true)
                .write((flags & libc::O_RDWR) != 0)
                .open(path)
                .map(|f| f.into())
                .map_err(|e| e.raw_os_error().unwrap_or(libc::EIO))
        }

        fn close_restricted(&mut self, fd: OwnedFd) {
            drop(File::from(fd));
        }
    }

    /// Device-discovery session, initialized on a seat and dispatched
    /// once per poll cycle.
    pub struct DispatchChannel {
        context: Libinput,
    }

    impl DispatchChannel {
        /// Initialize the context, assign the default seat, and
        /// dispatch once to drain device-added events. Success iff all
        /// three steps complete and a pollable descriptor exists.
        pub fn init() -> Option<Self> {
            let mut context = Libinput::new_with_udev(Interface);
            if context.udev_assign_seat("seat0").is_err() {
                warn!("libinput: failed to assign default seat");
                return None;
            }
            if context.dispatch().is_err() {
                warn!("libinput: initial dispatch failed");
                return None;
            }
            // Drain the device-added events from the initial dispatch
            // so steady-state polling doesn't see a backlog.
            for _ in context.by_ref() {}
            info!("libinput: dispatch-library channel ready");
            Some(Self { context })
        }

        /// Raw descriptor the host can multiplex with select/poll/kqueue.
        pub fn fd(&self) -> std::os::unix::io::RawFd {
            use std::os::unix::io::AsRawFd;
            self.context.as_raw_fd()
        }

        /// Dispatch once and drain all pending keyboard/pointer events.
        pub fn poll(
            &mut self,
            modifiers: &mut ModifierTracker,
            pointer: &mut PointerState,
            keys: &mut EventQueue<KeyEvent>,
            mice: &mut EventQueue<MouseEvent>,
        ) {
            if self.context.dispatch().is_err() {
                return;
            }
            for event in self.context.by_ref() {
                match event {
                    Event::Keyboard(k) => {
                        let code = k.key();
                        let pressed = matches!(k.key_state(), KeyState::Pressed);
                        modifiers.on_key(code, pressed);
                        keys.push(KeyEvent { key_code: code, modifiers: modifiers.bits(), pressed });
                    }
                    Event::Pointer(PointerEvent::Motion(m)) => {
                        pointer.translate(m.dx() as i32, m.dy() as i32);
                        mice.push(MouseEvent {
                            x: pointer.x(),
                            y: pointer.y(),
                            button: MouseButton::Left,
                            kind: MouseEventKind::Motion,
                            modifiers: Modifiers::empty(),
                        });
                    }
                    Event::Pointer(PointerEvent::Button(b)) => {
                        let Some(button) = button_from_evdev(b.button()) else { continue };
                        let kind = if matches!(b.button_state(), ButtonState::Pressed) {
                            MouseEventKind::Press
                        } else {
                            MouseEventKind::Release
                        };
                        let mut bits = pointer.buttons();
                        bits.set(MouseButtons::bit(button), kind == MouseEventKind::Press);
                        pointer.set_buttons(bits);
                        mice.push(MouseEvent {
                            x: pointer.x(),
                            y: pointer.y(),
                            button,
                            kind,
                            modifiers: Modifiers::empty(),
                        });
                    }
                    Event::Pointer(PointerEvent::ScrollWheel(_)) => {
                        // Scroll/gesture events are out of scope
                        // (touch/gesture input is not normalized here).
                        let _ = Axis::Vertical;
                    }
                    _ => {}
                }
            }
        }
    }
}

fn button_from_evdev(code: u32) -> Option<MouseButton> {
    match code {
        BTN_LEFT => Some(MouseButton::Left),
        BTN_RIGHT => Some(MouseButton::Right),
        BTN_MIDDLE => Some(MouseButton::Middle),
        _ => None,
    }
}

#[cfg(not(feature = "libinput"))]
mod stub_dispatch {
    use super::*;

    /// Built without the `libinput` feature: the `DispatchLibrary`
    /// probe always fails, and the channel selector falls through to
    /// evdev/VT/TTY.
    pub struct DispatchChannel;

    impl DispatchChannel {
        pub fn init() -> Option<Self> {
            None
        }

        pub fn poll(
            &mut self,
            _modifiers: &mut ModifierTracker,
            _pointer: &mut PointerState,
            _keys: &mut EventQueue<KeyEvent>,
            _mice: &mut EventQueue<MouseEvent>,
        ) {
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_mapping_uses_evdev_codes() {
        assert_eq!(button_from_evdev(0x110), Some(MouseButton::Left));
        assert_eq!(button_from_evdev(0x111), Some(MouseButton::Right));
        assert_eq!(button_from_evdev(0x112), Some(MouseButton::Middle));
        assert_eq!(button_from_evdev(0x999), None);
    }
}
