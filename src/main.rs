// src/main.rs
mod clock;
mod controller;
mod engine;
mod history;
mod session;
mod signal;
mod stim;
mod types;

use crate::types::{ConnectionPhase, ControllerCommand, ControllerEvent, ControllerSnapshot};
use anyhow::Result;
use log::{info, warn};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

/// How long the demo session runs before the driver stops it.
const DEMO_SESSION_SECS: u64 = 5;

/// Headless driver: connect, run one short session, disconnect, then dump
/// the final snapshot as JSON. Stands in for the presentation layer, so it
/// only sends commands and reads published snapshots.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    let runtime = engine::spawn_thread(tx, rx_cmd);

    tx_cmd.send(ControllerCommand::Connect)?;

    let mut last: Option<ControllerSnapshot> = None;
    let mut session_started = false;
    let mut stop_sent = false;

    loop {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(ControllerEvent::Snapshot(snap)) => {
                let phase_changed = last.as_ref().map(|p| p.phase) != Some(snap.phase);
                if phase_changed {
                    info!("phase -> {:?}", snap.phase);
                }
                match snap.phase {
                    ConnectionPhase::ConnectedIdle if !session_started => {
                        tx_cmd.send(ControllerCommand::StartSession)?;
                        session_started = true;
                    }
                    ConnectionPhase::ConnectedIdle if stop_sent && phase_changed => {
                        tx_cmd.send(ControllerCommand::Disconnect)?;
                    }
                    ConnectionPhase::ConnectedSession => {
                        if snap.session_secs >= DEMO_SESSION_SECS && !stop_sent {
                            tx_cmd.send(ControllerCommand::StopSession)?;
                            stop_sent = true;
                        }
                    }
                    ConnectionPhase::Disconnected if session_started => {
                        last = Some(snap);
                        break;
                    }
                    _ => {}
                }
                last = Some(snap);
            }
            Ok(ControllerEvent::CommandRejected { command, phase }) => {
                warn!("{command:?} rejected while {phase:?}");
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(tx_cmd);
    runtime.join().ok();

    if let Some(snap) = last {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    }
    Ok(())
}
