//! Band-limited oscillator
//!
//! Naive waveforms with PolyBLEP correction at every discontinuity.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::Triangle,
    ];

    /// Map a selector index (0-3) to a waveform, clamping out-of-range values
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 3) as usize]
    }

    /// Selector index of this waveform
    pub fn index(self) -> i32 {
        match self {
            Waveform::Sine => 0,
            Waveform::Saw => 1,
            Waveform::Square => 2,
            Waveform::Triangle => 3,
        }
    }

    /// The waveform after this one, wrapping around
    pub fn next(self) -> Self {
        Self::ALL[((self.index() + 1) % 4) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Saw => "saw",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
        }
    }
}

/// Polynomial band-limited step.
///
/// `t` is the phase in `[0, 1)`, `dt` the phase increment per sample.
/// Returns the residual to subtract from a falling edge located at `t = 0`.
pub fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// A single anti-aliased oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    phase_increment: f64,
}

impl Oscillator {
    /// Create a silent sine oscillator (zero increment)
    pub fn new() -> Self {
        Self {
            waveform: Waveform::Sine,
            phase: 0.0,
            phase_increment: 0.0,
        }
    }

    /// Set the waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set the frequency. No bound is applied; staying below Nyquist is up to the caller.
    pub fn set_frequency(&mut self, frequency: f64, sample_rate: f64) {
        self.phase_increment = frequency / sample_rate;
    }

    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Reset the phase to zero so a new note starts without a click
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Generate the next sample
    pub fn next_sample(&mut self) -> f32 {
        let p = self.phase;
        let dt = self.phase_increment;

        let sample = match self.waveform {
            Waveform::Sine => (p * 2.0 * PI).sin(),
            Waveform::Saw => 2.0 * p - 1.0 - poly_blep(p, dt),
            Waveform::Square => {
                // Half-cycle shifted phase. Must stay below 1.0 while p < 0.5,
                // otherwise rounding puts the falling-edge residual on the wrong side.
                let (naive, shifted) = if p < 0.5 {
                    (1.0, (p + 0.5).min(1.0 - f64::EPSILON))
                } else {
                    (-1.0, p - 0.5)
                };
                naive + poly_blep(p, dt) - poly_blep(shifted, dt)
            }
            Waveform::Triangle => {
                if p < 0.5 {
                    -1.0 + 4.0 * p
                } else {
                    3.0 - 4.0 * p
                }
            }
        };

        self.phase += dt;
        // rem_euclid also covers increments above 1.0 or below zero
        if !(0.0..1.0).contains(&self.phase) {
            self.phase = self.phase.rem_euclid(1.0);
        }

        sample as f32
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
