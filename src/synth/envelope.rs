//! ADSR envelope generator
//!
//! Linear Attack-Decay-Sustain-Release envelope. Each voice runs two of
//! these: one for amplitude, one for the filter cutoff.

use serde::{Deserialize, Serialize};

/// Shortest stage time in seconds
pub const MIN_STAGE_SECS: f32 = 0.01;
/// Longest stage time in seconds
pub const MAX_STAGE_SECS: f32 = 5.0;

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR settings. Times are in seconds, sustain is a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeParams {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Copy with every field forced into its valid range
    pub fn clamped(self) -> Self {
        Self {
            attack: clamp_time(self.attack),
            decay: clamp_time(self.decay),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: clamp_time(self.release),
        }
    }
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self::new(0.1, 0.1, 0.8, 0.1)
    }
}

fn clamp_time(seconds: f32) -> f32 {
    if seconds.is_nan() {
        return MIN_STAGE_SECS;
    }
    seconds.clamp(MIN_STAGE_SECS, MAX_STAGE_SECS)
}

/// ADSR envelope generator
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    sample_rate: f32,
    params: EnvelopeParams,

    // Per-sample increments derived from params and sample rate
    attack_rate: f32,
    decay_rate: f32,
    release_rate: f32,

    stage: EnvelopeStage,
    level: f32,
}

impl EnvelopeGenerator {
    /// Create an idle envelope with default parameters
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            sample_rate: 1.0,
            params: EnvelopeParams::default(),
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
            stage: EnvelopeStage::Idle,
            level: 0.0,
        };
        env.set_sample_rate(sample_rate);
        env
    }

    /// Change the host sample rate
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate_rates();
    }

    /// Apply new ADSR settings. Takes effect on the next sample.
    pub fn set_params(&mut self, params: EnvelopeParams) {
        let params = params.clamped();
        if params == self.params {
            return;
        }
        self.params = params;
        self.recalculate_rates();
    }

    pub fn params(&self) -> EnvelopeParams {
        self.params
    }

    fn recalculate_rates(&mut self) {
        let sr = self.sample_rate;
        self.attack_rate = 1.0 / (self.params.attack * sr);
        self.decay_rate = (1.0 - self.params.sustain) / (self.params.decay * sr);
        if self.stage == EnvelopeStage::Release {
            self.release_rate = self.level / (self.params.release * sr);
        }
    }

    /// Start (or restart) the attack stage from the current level
    pub fn note_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Enter the release stage from whatever stage is running
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.stage = EnvelopeStage::Release;
        self.release_rate = self.level / (self.params.release * self.sample_rate);
    }

    /// Force the envelope to idle at zero
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.release_rate = 0.0;
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// True in every stage but idle
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Current level without advancing
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Advance one sample and return the new level
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.params.sustain {
                    self.level = self.params.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                // Follows live sustain changes
                self.level = self.params.sustain;
            }

            EnvelopeStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.reset();
                }
            }
        }

        self.level
    }
}
