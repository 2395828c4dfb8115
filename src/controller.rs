// src/controller.rs
use crate::history::HistoryBuffer;
use crate::session::SessionClock;
use crate::signal::{self, SampleGenerator};
use crate::stim::StimulationGate;
use crate::types::{
    CognitiveState, ConnectionPhase, ControllerCommand, ControllerError, ControllerSnapshot,
    DataPoint,
};
use log::{debug, info};

/// Single owner of all published state.
///
/// The controller is time-free: the engine (or a test) decides when the
/// handshake completes and when ticks fire, and passes timestamps in. All
/// mutation goes through the methods below, on one thread, so observers can
/// only ever see a fully updated snapshot.
pub struct Controller {
    phase: ConnectionPhase,
    generator: SampleGenerator,
    battery_percent: u8,
    signal_quality: u8,
    focus_score: f64,
    cognitive_state: CognitiveState,
    stim: StimulationGate,
    history: HistoryBuffer,
    session: SessionClock,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_generator(SampleGenerator::new())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_generator(SampleGenerator::with_seed(seed))
    }

    fn with_generator(generator: SampleGenerator) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            generator,
            battery_percent: 0,
            signal_quality: 0,
            focus_score: 0.0,
            cognitive_state: CognitiveState::Distracted,
            stim: StimulationGate::new(),
            history: HistoryBuffer::new(),
            session: SessionClock::new(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Applies one lifecycle command.
    ///
    /// `Connect`/`Disconnect` outside their source phase are idempotent
    /// no-ops; `StartSession`/`StopSession` outside theirs are rejected with
    /// `InvalidTransition` and leave the state untouched.
    pub fn handle_command(&mut self, command: ControllerCommand) -> Result<(), ControllerError> {
        match command {
            ControllerCommand::Connect => {
                if self.phase == ConnectionPhase::Disconnected {
                    self.phase = ConnectionPhase::Connecting;
                    info!("⏳ connecting to headset");
                } else {
                    debug!("connect ignored while {:?}", self.phase);
                }
                Ok(())
            }
            ControllerCommand::Disconnect => {
                if self.phase == ConnectionPhase::Disconnected {
                    debug!("disconnect ignored while disconnected");
                } else {
                    // Duration and history survive for inspection; only the
                    // next session start clears the counter.
                    if self.session.is_running() {
                        self.session.stop();
                    }
                    self.phase = ConnectionPhase::Disconnected;
                    info!("🛑 disconnected");
                }
                Ok(())
            }
            ControllerCommand::StartSession => {
                if self.phase != ConnectionPhase::ConnectedIdle {
                    return Err(self.rejected(command));
                }
                self.session.start();
                self.phase = ConnectionPhase::ConnectedSession;
                info!("🌊 session started");
                Ok(())
            }
            ControllerCommand::StopSession => {
                if self.phase != ConnectionPhase::ConnectedSession {
                    return Err(self.rejected(command));
                }
                self.session.stop();
                self.phase = ConnectionPhase::ConnectedIdle;
                info!("session stopped at {}s", self.session.elapsed_secs());
                Ok(())
            }
        }
    }

    fn rejected(&self, command: ControllerCommand) -> ControllerError {
        ControllerError::InvalidTransition {
            command,
            phase: self.phase,
        }
    }

    /// Finishes the connection handshake. Only meaningful while
    /// `Connecting`; the engine never calls it otherwise.
    pub fn complete_handshake(&mut self) {
        if self.phase != ConnectionPhase::Connecting {
            return;
        }
        self.battery_percent = self.generator.battery_percent();
        self.signal_quality = self.generator.signal_quality();
        self.phase = ConnectionPhase::ConnectedIdle;
        info!(
            "✅ headset connected (battery {}%, signal {}%)",
            self.battery_percent, self.signal_quality
        );
    }

    /// One pass of the data pipeline: sample -> smooth -> classify -> gate
    /// -> record. Runs on every fast tick while connected, idle or in-session.
    pub fn data_tick(&mut self, elapsed_secs: f64) {
        if !self.phase.is_connected() {
            return;
        }
        let sample = self.generator.next_sample();
        self.focus_score = signal::smooth_focus(sample, self.focus_score);
        self.cognitive_state = signal::classify(self.focus_score);
        let stimulating = self.stim.update(self.cognitive_state);
        self.history.append(DataPoint {
            timestamp_secs: elapsed_secs,
            alpha: sample.alpha,
            theta: sample.theta,
            focus_score: self.focus_score,
        });
        debug!(
            "tick t={elapsed_secs:.1}s score={:.1} state={:?} stim={stimulating} hist={}",
            self.focus_score,
            self.cognitive_state,
            self.history.len()
        );
    }

    /// One second of session time (slow schedule).
    pub fn clock_tick(&mut self) {
        self.session.tick();
    }

    /// Immutable copy of the full published state.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            is_connected: self.phase.is_connected(),
            phase: self.phase,
            battery_percent: self.battery_percent,
            signal_quality: self.signal_quality,
            focus_score: self.focus_score,
            cognitive_state: self.cognitive_state,
            is_stimulating: self.stim.is_active(),
            session_secs: self.session.elapsed_secs(),
            history: self.history.to_vec(),
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
