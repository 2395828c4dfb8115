// src/signal.rs
use crate::types::{CognitiveState, Sample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Band power ranges of the simulated headset feed.
const ALPHA_MIN: f64 = 0.3;
const ALPHA_MAX: f64 = 0.8;
const THETA_MIN: f64 = 0.2;
const THETA_MAX: f64 = 0.6;

/// EMA weight of the newest instantaneous score.
const SMOOTHING: f64 = 0.1;
/// Keeps the alpha/theta ratio finite when theta is at the bottom of its range.
const THETA_FLOOR: f64 = 0.1;

const FLOW_THRESHOLD: f64 = 80.0;
const FOCUSED_THRESHOLD: f64 = 50.0;

/// Stochastic stand-in for a real sensor feed.
///
/// Produces one alpha/theta pair per data tick, plus the one-shot telemetry
/// values the simulated headset reports when a connection is established.
pub struct SampleGenerator {
    rng: StdRng,
}

impl SampleGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_sample(&mut self) -> Sample {
        Sample {
            alpha: self.rng.gen_range(ALPHA_MIN..=ALPHA_MAX),
            theta: self.rng.gen_range(THETA_MIN..=THETA_MAX),
        }
    }

    /// Battery level the headset reports at handshake time.
    pub fn battery_percent(&mut self) -> u8 {
        self.rng.gen_range(60..=100)
    }

    /// Contact quality the headset reports at handshake time.
    pub fn signal_quality(&mut self) -> u8 {
        self.rng.gen_range(85..=99)
    }
}

/// Scores one sample against the previous smoothed score.
///
/// The instantaneous score is the alpha/theta ratio scaled to [0, 100]; the
/// returned value is an exponential moving average so a single noisy sample
/// cannot jerk the actuator. Output stays in [0, 100] for any previous score
/// in [0, 100].
pub fn smooth_focus(sample: Sample, previous: f64) -> f64 {
    let ratio = sample.alpha / (sample.theta + THETA_FLOOR);
    let instantaneous = (ratio * 100.0).clamp(0.0, 100.0);
    previous * (1.0 - SMOOTHING) + instantaneous * SMOOTHING
}

/// Maps a smoothed score onto a cognitive state. Total: every finite score
/// lands in exactly one of `Flow`, `Focused`, `Distracted`. `SignalNoise` is
/// never produced here (no artifact-detection input exists yet).
pub fn classify(score: f64) -> CognitiveState {
    if score > FLOW_THRESHOLD {
        CognitiveState::Flow
    } else if score > FOCUSED_THRESHOLD {
        CognitiveState::Focused
    } else {
        CognitiveState::Distracted
    }
}
