//! Terminal front end for the camera app.
//!
//! Reads one-letter commands from stdin, forwards them to the engine thread
//! and prints every engine event to stdout as a JSON line.

mod commands;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camera_engine::{create_engine, PreviewSlot};
use camera_ipc::{
    command_channel, event_channel, SessionCommand, SessionConfig, SessionEvent, SessionState,
};

use crate::commands::{parse_input, Input, HELP};

/// Initialize logging. Logs go to stderr; stdout carries events.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "camera_app=debug,camera_engine=debug,camera_capture=debug,camera_encoder=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_event(event: &SessionEvent) {
    match serde_json::to_string(event) {
        Ok(line) => {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{line}");
            let _ = stdout.flush();
        }
        Err(e) => error!("Failed to serialize event: {}", e),
    }
}

fn print_preview(preview: &PreviewSlot, state: &RwLock<SessionState>) {
    match preview.latest() {
        Some(frame) => eprintln!(
            "frame #{} {}x{} ({} channels), state {}",
            frame.sequence,
            frame.width,
            frame.height,
            frame.channels(),
            state.read().name()
        ),
        None => eprintln!("no frame yet, state {}", state.read().name()),
    }
}

fn main() -> Result<()> {
    init_logging();
    info!("Camera app starting");

    let config = SessionConfig::default();
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let preview = PreviewSlot::new();
    let state = Arc::new(RwLock::new(SessionState::Idle));

    // The camera handle is not Send, so the engine is built on its own thread.
    let engine_preview = preview.clone();
    let engine_state = Arc::clone(&state);
    let engine_thread = thread::Builder::new()
        .name("camera-engine".into())
        .spawn(move || {
            let mut engine = create_engine(config, command_rx, event_tx)
                .with_preview(engine_preview)
                .with_state_handle(engine_state);
            engine.run();
        })
        .context("failed to spawn engine thread")?;

    let event_thread = thread::Builder::new()
        .name("camera-events".into())
        .spawn(move || {
            for event in event_rx.iter() {
                print_event(&event);
            }
        })
        .context("failed to spawn event thread")?;

    eprintln!("{HELP}");
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        match parse_input(&line) {
            Some(Input::Command(command)) => {
                if command_tx.send(command).is_err() {
                    error!("Engine stopped unexpectedly");
                    break;
                }
            }
            Some(Input::Preview) => print_preview(&preview, &state),
            Some(Input::Help) => eprintln!("{HELP}"),
            Some(Input::Quit) => break,
            None => eprintln!("unknown command {:?}, h for help", line.trim()),
        }
    }

    // Stdin closed or quit: finalize any recording and release the camera.
    let _ = command_tx.send(SessionCommand::Shutdown);
    drop(command_tx);
    if engine_thread.join().is_err() {
        error!("Engine thread panicked");
    }
    if event_thread.join().is_err() {
        error!("Event thread panicked");
    }

    info!("Camera app stopped");
    Ok(())
}
