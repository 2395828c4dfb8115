// src/types.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection/session lifecycle phase of the controller.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ConnectionPhase {
    Disconnected,
    /// Handshake in flight; no data ticks yet.
    Connecting,
    ConnectedIdle,
    ConnectedSession,
}

impl ConnectionPhase {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::ConnectedIdle | Self::ConnectedSession)
    }
}

/// Discrete cognitive state derived from the smoothed focus score.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum CognitiveState {
    Flow,
    Focused,
    Distracted,
    /// Reserved for a future artifact-detection input; the classifier
    /// never emits it today.
    SignalNoise,
}

/// Commands the presentation side sends to the engine thread.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ControllerCommand {
    Connect,
    Disconnect,
    StartSession,
    StopSession,
}

/// One raw headset reading. Produced fresh each data tick and dropped once
/// the derived `DataPoint` exists.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    /// Alpha band power, uniform in [0.3, 0.8].
    pub alpha: f64,
    /// Theta band power, uniform in [0.2, 0.6].
    pub theta: f64,
}

/// One scored reading retained in the history buffer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Seconds since the current connection was established.
    pub timestamp_secs: f64,
    pub alpha: f64,
    pub theta: f64,
    /// Smoothed focus score in [0, 100].
    pub focus_score: f64,
}

/// Read-only copy of the controller's published state. Observers get clones
/// and can never mutate the original.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub is_connected: bool,
    pub phase: ConnectionPhase,
    pub battery_percent: u8,
    pub signal_quality: u8,
    pub focus_score: f64,
    pub cognitive_state: CognitiveState,
    pub is_stimulating: bool,
    pub session_secs: u64,
    /// Most recent scored readings, oldest first, at most 50.
    pub history: Vec<DataPoint>,
}

/// Messages the engine thread publishes back to its observers.
#[derive(Clone, Debug)]
pub enum ControllerEvent {
    Snapshot(ControllerSnapshot),
    CommandRejected {
        command: ControllerCommand,
        phase: ConnectionPhase,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    #[error("{command:?} is not valid while {phase:?}")]
    InvalidTransition {
        command: ControllerCommand,
        phase: ConnectionPhase,
    },
    #[error("history buffer holds {len} points, capacity is {capacity}")]
    BufferOverCapacity { len: usize, capacity: usize },
}
