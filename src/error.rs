// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy.
//!
//! Only `AllocationFailed` would ever escape the public API (and in
//! safe Rust never does — it is documented, not constructed). Every
//! other condition degrades a channel or drops an event and is logged,
//! never propagated.

/// Errors raised by `bsd-input-core`.
#[derive(Debug, thiserror::Error)]
pub enum InputCoreError {
    /// Memory allocation failed. In safe Rust this aborts the process
    /// before this variant could ever be constructed; it is kept for
    /// the record.
    #[error("allocation failed")]
    AllocationFailed,

    /// No keyboard or mouse channel could be opened. Non-fatal: the
    /// resulting `Handler` is usable but produces no events.
    #[error("no input channels available")]
    NoInputChannels,

    /// A terminal's termios state could not be restored on deinit.
    #[error("terminal state could not be restored: {0}")]
    TerminalStateUnrestorable(#[source] std::io::Error),
}
