// src/engine.rs
use crate::clock::{Clock, SystemClock};
use crate::controller::Controller;
use crate::types::{ConnectionPhase, ControllerCommand, ControllerEvent};
use log::warn;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// Fast schedule: one pass of the data pipeline.
pub const DATA_TICK_PERIOD: Duration = Duration::from_millis(100);
/// Slow schedule: one second of session time.
pub const SESSION_TICK_PERIOD: Duration = Duration::from_secs(1);
/// One-shot connection handshake latency.
pub const HANDSHAKE_DELAY: Duration = Duration::from_millis(1500);

/// How often the engine thread polls for commands and due deadlines.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Single-writer runtime around the [`Controller`].
///
/// Commands come in over mpsc, snapshots go out over mpsc, and all three
/// schedules (fast tick, slow tick, handshake) are deadlines checked against
/// the injected clock. Everything runs in `step()`, on one thread, so the
/// two periodic bodies can never interleave against shared state, and a
/// `Disconnect` clears the deadlines before the next scan: no tick fires
/// after the command is processed.
pub struct Engine<C: Clock> {
    controller: Controller,
    clock: C,
    tx: Sender<ControllerEvent>,
    rx_cmd: Receiver<ControllerCommand>,
    handshake_due: Option<Instant>,
    next_data_tick: Option<Instant>,
    next_session_tick: Option<Instant>,
    connected_at: Option<Instant>,
}

impl<C: Clock> Engine<C> {
    pub fn new(tx: Sender<ControllerEvent>, rx_cmd: Receiver<ControllerCommand>, clock: C) -> Self {
        Self {
            controller: Controller::new(),
            clock,
            tx,
            rx_cmd,
            handshake_due: None,
            next_data_tick: None,
            next_session_tick: None,
            connected_at: None,
        }
    }

    /// One loop iteration: drain pending commands, then fire every deadline
    /// that has come due, oldest first. Returns `false` once the command
    /// channel is closed and the engine should shut down.
    pub fn step(&mut self) -> bool {
        loop {
            match self.rx_cmd.try_recv() {
                Ok(command) => self.apply_command(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        let now = self.clock.now();

        if let Some(due) = self.handshake_due {
            if due <= now {
                self.handshake_due = None;
                self.controller.complete_handshake();
                // Data ticks exist only from this point on.
                self.connected_at = Some(due);
                self.next_data_tick = Some(due + DATA_TICK_PERIOD);
                self.publish();
            }
        }

        // Missed periods are caught up one by one so a stalled thread still
        // produces every tick, in order.
        while let (Some(due), Some(connected_at)) = (self.next_data_tick, self.connected_at) {
            if due > now {
                break;
            }
            self.controller.data_tick((due - connected_at).as_secs_f64());
            self.next_data_tick = Some(due + DATA_TICK_PERIOD);
            self.publish();
        }

        while let Some(due) = self.next_session_tick {
            if due > now {
                break;
            }
            self.controller.clock_tick();
            self.next_session_tick = Some(due + SESSION_TICK_PERIOD);
            self.publish();
        }

        true
    }

    fn apply_command(&mut self, command: ControllerCommand) {
        let before = self.controller.phase();
        match self.controller.handle_command(command) {
            Ok(()) => {
                let after = self.controller.phase();
                match (before, after) {
                    (ConnectionPhase::Disconnected, ConnectionPhase::Connecting) => {
                        self.handshake_due = Some(self.clock.now() + HANDSHAKE_DELAY);
                    }
                    (
                        ConnectionPhase::Connecting
                        | ConnectionPhase::ConnectedIdle
                        | ConnectionPhase::ConnectedSession,
                        ConnectionPhase::Disconnected,
                    ) => {
                        self.handshake_due = None;
                        self.next_data_tick = None;
                        self.next_session_tick = None;
                        self.connected_at = None;
                    }
                    (ConnectionPhase::ConnectedIdle, ConnectionPhase::ConnectedSession) => {
                        self.next_session_tick = Some(self.clock.now() + SESSION_TICK_PERIOD);
                    }
                    (ConnectionPhase::ConnectedSession, ConnectionPhase::ConnectedIdle) => {
                        self.next_session_tick = None;
                    }
                    _ => {}
                }
                if before != after {
                    self.publish();
                }
            }
            Err(err) => {
                warn!("command rejected: {err}");
                self.tx
                    .send(ControllerEvent::CommandRejected {
                        command,
                        phase: before,
                    })
                    .ok();
            }
        }
    }

    fn publish(&self) {
        self.tx
            .send(ControllerEvent::Snapshot(self.controller.snapshot()))
            .ok();
    }
}

/// Spawns the engine thread on the real clock. Mirrors the channel wiring
/// the caller sets up: events out on `tx`, commands in on `rx_cmd`. The
/// thread exits once every command sender is dropped.
pub fn spawn_thread(
    tx: Sender<ControllerEvent>,
    rx_cmd: Receiver<ControllerCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut engine = Engine::new(tx, rx_cmd, SystemClock);
        while engine.step() {
            thread::sleep(POLL_INTERVAL);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::ControllerSnapshot;
    use std::sync::mpsc::channel;

    struct Harness {
        engine: Engine<ManualClock>,
        clock: ManualClock,
        tx_cmd: Sender<ControllerCommand>,
        rx: Receiver<ControllerEvent>,
    }

    fn harness() -> Harness {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let clock = ManualClock::new();
        let engine = Engine::new(tx, rx_cmd, clock.clone());
        Harness {
            engine,
            clock,
            tx_cmd,
            rx,
        }
    }

    fn snapshots(rx: &Receiver<ControllerEvent>) -> Vec<ControllerSnapshot> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ControllerEvent::Snapshot(snap) = event {
                out.push(snap);
            }
        }
        out
    }

    #[test]
    fn handshake_fires_after_delay_and_starts_data_ticks() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.engine.step();

        // Just shy of the handshake latency: still connecting, no data.
        h.clock.advance(Duration::from_millis(1499));
        h.engine.step();
        let pre = snapshots(&h.rx);
        assert!(pre.iter().all(|s| !s.is_connected));

        h.clock.advance(Duration::from_millis(1));
        h.engine.step();
        let snaps = snapshots(&h.rx);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].phase, ConnectionPhase::ConnectedIdle);
        assert!(snaps[0].history.is_empty());

        // One second of virtual time yields exactly ten data ticks.
        h.clock.advance(Duration::from_secs(1));
        h.engine.step();
        let snaps = snapshots(&h.rx);
        assert_eq!(snaps.len(), 10);
        assert_eq!(snaps.last().unwrap().history.len(), 10);
        let lens: Vec<usize> = snaps.iter().map(|s| s.history.len()).collect();
        assert_eq!(lens, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn disconnect_before_handshake_cancels_it_forever() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.tx_cmd.send(ControllerCommand::Disconnect).unwrap();
        h.engine.step();

        h.clock.advance(Duration::from_secs(5));
        h.engine.step();

        let snaps = snapshots(&h.rx);
        assert!(snaps.iter().all(|s| !s.is_connected));
        assert!(snaps.iter().all(|s| s.history.is_empty()));
        assert_eq!(snaps.last().unwrap().phase, ConnectionPhase::Disconnected);
    }

    #[test]
    fn duplicate_connect_yields_a_single_handshake() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.engine.step();

        h.clock.advance(HANDSHAKE_DELAY);
        h.engine.step();

        let snaps = snapshots(&h.rx);
        let connecting = snaps
            .iter()
            .filter(|s| s.phase == ConnectionPhase::Connecting)
            .count();
        let idle = snaps
            .iter()
            .filter(|s| s.phase == ConnectionPhase::ConnectedIdle)
            .count();
        assert_eq!(connecting, 1);
        assert_eq!(idle, 1);
    }

    #[test]
    fn session_clock_counts_only_while_session_runs() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.engine.step();
        h.clock.advance(HANDSHAKE_DELAY);
        h.engine.step();

        h.tx_cmd.send(ControllerCommand::StartSession).unwrap();
        h.engine.step();
        h.clock.advance(Duration::from_secs(5));
        h.engine.step();

        let snaps = snapshots(&h.rx);
        assert_eq!(snaps.last().unwrap().session_secs, 5);
        // Published session durations never move backwards.
        let secs: Vec<u64> = snaps.iter().map(|s| s.session_secs).collect();
        assert!(secs.windows(2).all(|w| w[0] <= w[1]));

        h.tx_cmd.send(ControllerCommand::StopSession).unwrap();
        h.engine.step();
        h.clock.advance(Duration::from_secs(3));
        h.engine.step();
        let snaps = snapshots(&h.rx);
        assert!(snaps.iter().all(|s| s.session_secs == 5));
        // Data ticks keep flowing while connected-idle.
        assert!(snaps.last().unwrap().history.len() > 10);
    }

    #[test]
    fn rejected_commands_surface_as_events() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::StartSession).unwrap();
        h.engine.step();

        match h.rx.try_recv().unwrap() {
            ControllerEvent::CommandRejected { command, phase } => {
                assert_eq!(command, ControllerCommand::StartSession);
                assert_eq!(phase, ConnectionPhase::Disconnected);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_stops_both_schedules_synchronously() {
        let mut h = harness();
        h.tx_cmd.send(ControllerCommand::Connect).unwrap();
        h.engine.step();
        h.clock.advance(HANDSHAKE_DELAY);
        h.engine.step();
        h.tx_cmd.send(ControllerCommand::StartSession).unwrap();
        h.engine.step();
        h.clock.advance(Duration::from_secs(2));
        h.engine.step();
        let before = snapshots(&h.rx).last().unwrap().clone();

        h.tx_cmd.send(ControllerCommand::Disconnect).unwrap();
        h.engine.step();
        h.clock.advance(Duration::from_secs(10));
        h.engine.step();

        let snaps = snapshots(&h.rx);
        // Exactly one event after the disconnect: its own snapshot. Nothing
        // ticks afterwards, and retained state survives for inspection.
        assert_eq!(snaps.len(), 1);
        let last = &snaps[0];
        assert_eq!(last.phase, ConnectionPhase::Disconnected);
        assert_eq!(last.history, before.history);
        assert_eq!(last.session_secs, before.session_secs);
    }

    #[test]
    fn engine_stops_when_command_channel_closes() {
        let mut h = harness();
        drop(h.tx_cmd);
        assert!(!h.engine.step());
    }
}
