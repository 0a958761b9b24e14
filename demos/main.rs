// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Demo binary: constructs a `Handler`, polls it on a fixed-rate loop,
//! and prints decoded events until Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{info, LevelFilter};

use bsd_input_core::Handler;

#[derive(Parser, Debug)]
#[command(name = "bsd-input-demo", about = "Poll the FreeBSD keyboard/mouse acquisition core and print decoded events")]
struct Args {
    /// Host screen width used for pointer clamping.
    #[arg(long, default_value_t = 640)]
    screen_width: u32,

    /// Host screen height used for pointer clamping.
    #[arg(long, default_value_t = 480)]
    screen_height: u32,

    /// Poll rate in cycles per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Raise the log level from info to debug.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let mut handler = Handler::init(args.screen_width, args.screen_height);
    info!(
        "keyboard channel: {:?}, mouse channel: {:?}",
        handler.active_keyboard_mode(),
        handler.active_mouse_mode()
    );

    let period = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);

    while running.load(Ordering::SeqCst) {
        handler.poll();

        for key in handler.drain_key_events() {
            info!("key: code={} pressed={} mods={:?}", key.key_code, key.pressed, key.modifiers);
        }
        for mouse in handler.drain_mouse_events() {
            info!("mouse: ({}, {}) {:?} {:?}", mouse.x, mouse.y, mouse.kind, mouse.button);
        }

        thread::sleep(period);
    }

    info!("shutting down, stats: {:?}", handler.stats());
    handler.deinit();
    Ok(())
}
