// src/stim.rs
use crate::types::CognitiveState;

/// Hysteresis gate for the binary stimulation output.
///
/// Activation requires entering `Distracted` while inactive; deactivation
/// requires reaching `Flow`. `Focused` is a dead zone that holds the last
/// decision, which keeps the output from toggling every time the score
/// hovers around a threshold. `SignalNoise` also holds: an artifact reading
/// must never flip the actuator on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct StimulationGate {
    active: bool,
}

impl StimulationGate {
    pub fn new() -> Self {
        Self { active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feeds one classified state through the gate and returns the new
    /// output level.
    pub fn update(&mut self, state: CognitiveState) -> bool {
        match state {
            CognitiveState::Distracted if !self.active => self.active = true,
            CognitiveState::Flow => self.active = false,
            CognitiveState::Distracted
            | CognitiveState::Focused
            | CognitiveState::SignalNoise => {}
        }
        self.active
    }
}
