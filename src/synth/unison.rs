//! Unison oscillator bank
//!
//! Up to seven detuned copies of the same oscillator, spread across the
//! stereo field with a constant-power pan law.

use super::{Oscillator, Waveform};
use std::f32::consts::FRAC_PI_4;

/// Maximum number of unison voices
pub const MAX_UNISON_VOICES: usize = 7;

/// Detune of the outermost voice pair at full detune, in cents per voice step
const MAX_DETUNE_CENTS: f32 = 15.0;

/// A bank of detuned oscillators mixed to stereo
#[derive(Debug, Clone)]
pub struct UnisonOscillator {
    oscillators: [Oscillator; MAX_UNISON_VOICES],
    voices: usize,
    detune: f32,
    stereo_width: f32,
}

impl UnisonOscillator {
    pub fn new() -> Self {
        Self {
            oscillators: std::array::from_fn(|_| Oscillator::new()),
            voices: 1,
            detune: 0.5,
            stereo_width: 0.5,
        }
    }

    /// Set the number of active voices (clamped to 1-7)
    pub fn set_voices(&mut self, voices: i32) {
        self.voices = voices.clamp(1, MAX_UNISON_VOICES as i32) as usize;
    }

    pub fn voices(&self) -> usize {
        self.voices
    }

    /// Set the detune amount (0.0-1.0)
    pub fn set_detune(&mut self, amount: f32) {
        self.detune = amount.clamp(0.0, 1.0);
    }

    pub fn detune(&self) -> f32 {
        self.detune
    }

    /// Set the stereo width (0.0-1.0)
    pub fn set_stereo_width(&mut self, width: f32) {
        self.stereo_width = width.clamp(0.0, 1.0);
    }

    pub fn stereo_width(&self) -> f32 {
        self.stereo_width
    }

    /// Set the waveform on every oscillator, active or not
    pub fn set_waveform(&mut self, waveform: Waveform) {
        for osc in &mut self.oscillators {
            osc.set_waveform(waveform);
        }
    }

    /// Frequency ratio applied to voice `index` under the current settings
    pub fn frequency_ratio(&self, index: usize) -> f32 {
        if self.voices <= 1 {
            return 1.0;
        }
        let offset = index as i32 - (self.voices / 2) as i32;
        let cents = offset as f32 * self.detune * MAX_DETUNE_CENTS;
        2.0f32.powf(cents / 1200.0)
    }

    /// Pan position of voice `index` in `[-1, 1]`
    pub fn pan(&self, index: usize) -> f32 {
        if self.voices <= 1 {
            return 0.0;
        }
        let spread = (2.0 * index as f32 / (self.voices - 1) as f32) - 1.0;
        spread * self.stereo_width
    }

    /// Retune the active oscillators around `frequency`
    pub fn set_frequency(&mut self, frequency: f64, sample_rate: f64) {
        for i in 0..self.voices {
            let ratio = self.frequency_ratio(i) as f64;
            self.oscillators[i].set_frequency(frequency * ratio, sample_rate);
        }
    }

    /// Zero the phase of every oscillator
    pub fn reset(&mut self) {
        for osc in &mut self.oscillators {
            osc.reset();
        }
    }

    /// Generate the next stereo sample pair
    pub fn next_sample_stereo(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;

        for i in 0..self.voices {
            let sample = self.oscillators[i].next_sample();
            let angle = (self.pan(i) + 1.0) * FRAC_PI_4;
            left += sample * angle.cos();
            right += sample * angle.sin();
        }

        let norm = 1.0 / (self.voices as f32).sqrt();
        (left * norm, right * norm)
    }
}

impl Default for UnisonOscillator {
    fn default() -> Self {
        Self::new()
    }
}
