// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Evdev fixed-size record reader.
//!
//! The two leading time fields are parsed manually rather than
//! modeled as a `#[repr(C)]` struct, because their width is the
//! platform word size and a struct read would be vulnerable to
//! compiler-inserted padding that a raw kernel record never has.

use crate::event::KeyEvent;
use crate::modifiers::ModifierTracker;
use crate::queue::EventQueue;

const EV_KEY: u16 = 0x01;

const VALUE_RELEASE: i32 = 0;
const VALUE_PRESS: i32 = 1;
const VALUE_REPEAT: i32 = 2;

/// Width in bytes of the two leading `time_t`/`suseconds_t` fields on
/// this platform. FreeBSD and Linux both use a word-sized pair here;
/// `libc::time_t` gives the correct width on every target this crate
/// builds for.
pub fn time_field_width() -> usize {
    std::mem::size_of::<libc::time_t>()
}

/// Total record size: two native-word time fields, then
/// `u16 type, u16 code, i32 value`.
pub fn record_size() -> usize {
    2 * time_field_width() + 8
}

/// One decoded record, with the time fields discarded (this core has
/// no use for kernel event timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawRecord {
    event_type: u16,
    code: u16,
    value: i32,
}

fn parse_record(bytes: &[u8]) -> Option<RawRecord> {
    let w = time_field_width();
    if bytes.len() < record_size() {
        return None;
    }
    let type_off = 2 * w;
    let code_off = type_off + 2;
    let value_off = code_off + 2;

    let event_type = u16::from_ne_bytes(bytes[type_off..type_off + 2].try_into().ok()?);
    let code = u16::from_ne_bytes(bytes[code_off..code_off + 2].try_into().ok()?);
    let value = i32::from_ne_bytes(bytes[value_off..value_off + 4].try_into().ok()?);
    Some(RawRecord { event_type, code, value })
}

/// Decode as many complete records as `buf` holds (a short read is
/// handled by integer-dividing the byte count by the record size),
/// updating `modifiers` and pushing normalized events onto `queue`.
pub fn decode_buffer(buf: &[u8], modifiers: &mut ModifierTracker, queue: &mut EventQueue<KeyEvent>) {
    let size = record_size();
    if size == 0 {
        return;
    }
    let count = buf.len() / size;
    for i in 0..count {
        let chunk = &buf[i * size..i * size + size];
        let Some(record) = parse_record(chunk) else { continue };
        if record.event_type != EV_KEY {
            continue;
        }
        let pressed = match record.value {
            VALUE_PRESS => true,
            VALUE_RELEASE => false,
            VALUE_REPEAT => continue,
            _ => continue,
        };
        let code = record.code as u32;
        modifiers.on_key(code, pressed);
        queue.push(KeyEvent {
            key_code: code,
            modifiers: modifiers.bits(),
            pressed,
        });
    }
}
