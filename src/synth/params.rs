//! Control parameters
//!
//! `SynthParams` is the plain snapshot the render thread applies once per
//! block. `SharedParams` is the lock-free store the control thread writes
//! into; every scalar is its own atomic so reads are never torn.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

pub use atomic_float::AtomicF32;

use super::{EnvelopeParams, Waveform};

/// Snapshot of every patch parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthParams {
    /// Amplitude envelope
    pub amp_envelope: EnvelopeParams,
    /// Filter envelope
    pub filter_envelope: EnvelopeParams,
    /// Base filter cutoff in Hz (20-20000)
    pub cutoff: f32,
    /// Filter resonance (0.1-10)
    pub resonance: f32,
    /// Filter envelope depth in percent (-100 to 100)
    pub env_amount: f32,
    pub waveform: Waveform,
    /// Unison voice count (1-7)
    pub unison_voices: i32,
    /// Unison detune (0-1)
    pub detune: f32,
    /// Unison stereo width (0-1)
    pub stereo_width: f32,
    pub noise_enabled: bool,
    /// Noise level (0-1)
    pub noise_level: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            amp_envelope: EnvelopeParams::new(0.1, 0.1, 0.8, 0.1),
            filter_envelope: EnvelopeParams::new(0.3, 0.8, 0.3, 0.5),
            cutoff: 1000.0,
            resonance: 1.0,
            env_amount: 80.0,
            waveform: Waveform::Sine,
            unison_voices: 3,
            detune: 0.5,
            stereo_width: 0.5,
            noise_enabled: false,
            noise_level: 0.3,
        }
    }
}

#[derive(Debug)]
struct AtomicEnvelope {
    attack: AtomicF32,
    decay: AtomicF32,
    sustain: AtomicF32,
    release: AtomicF32,
}

impl AtomicEnvelope {
    fn new(params: EnvelopeParams) -> Self {
        Self {
            attack: AtomicF32::new(params.attack),
            decay: AtomicF32::new(params.decay),
            sustain: AtomicF32::new(params.sustain),
            release: AtomicF32::new(params.release),
        }
    }

    fn load(&self) -> EnvelopeParams {
        EnvelopeParams::new(
            self.attack.load(Ordering::Relaxed),
            self.decay.load(Ordering::Relaxed),
            self.sustain.load(Ordering::Relaxed),
            self.release.load(Ordering::Relaxed),
        )
    }

    fn store(&self, params: EnvelopeParams) {
        self.attack.store(params.attack, Ordering::Relaxed);
        self.decay.store(params.decay, Ordering::Relaxed);
        self.sustain.store(params.sustain, Ordering::Relaxed);
        self.release.store(params.release, Ordering::Relaxed);
    }
}

/// Parameters shared between the control thread and the render thread
#[derive(Debug)]
pub struct SharedParams {
    amp_envelope: AtomicEnvelope,
    filter_envelope: AtomicEnvelope,
    cutoff: AtomicF32,
    resonance: AtomicF32,
    env_amount: AtomicF32,
    waveform: AtomicI32,
    unison_voices: AtomicI32,
    detune: AtomicF32,
    stereo_width: AtomicF32,
    noise_enabled: AtomicBool,
    noise_level: AtomicF32,
}

impl SharedParams {
    pub fn new(initial: &SynthParams) -> Self {
        Self {
            amp_envelope: AtomicEnvelope::new(initial.amp_envelope),
            filter_envelope: AtomicEnvelope::new(initial.filter_envelope),
            cutoff: AtomicF32::new(initial.cutoff),
            resonance: AtomicF32::new(initial.resonance),
            env_amount: AtomicF32::new(initial.env_amount),
            waveform: AtomicI32::new(initial.waveform.index()),
            unison_voices: AtomicI32::new(initial.unison_voices),
            detune: AtomicF32::new(initial.detune),
            stereo_width: AtomicF32::new(initial.stereo_width),
            noise_enabled: AtomicBool::new(initial.noise_enabled),
            noise_level: AtomicF32::new(initial.noise_level),
        }
    }

    /// Publish a whole patch. Readers may see a mix of old and new fields
    /// for one block, never a torn field.
    pub fn store(&self, params: &SynthParams) {
        self.amp_envelope.store(params.amp_envelope);
        self.filter_envelope.store(params.filter_envelope);
        self.cutoff.store(params.cutoff, Ordering::Relaxed);
        self.resonance.store(params.resonance, Ordering::Relaxed);
        self.env_amount.store(params.env_amount, Ordering::Relaxed);
        self.waveform
            .store(params.waveform.index(), Ordering::Relaxed);
        self.unison_voices
            .store(params.unison_voices, Ordering::Relaxed);
        self.detune.store(params.detune, Ordering::Relaxed);
        self.stereo_width.store(params.stereo_width, Ordering::Relaxed);
        self.noise_enabled
            .store(params.noise_enabled, Ordering::Relaxed);
        self.noise_level.store(params.noise_level, Ordering::Relaxed);
    }

    /// Read every field once
    pub fn snapshot(&self) -> SynthParams {
        SynthParams {
            amp_envelope: self.amp_envelope.load(),
            filter_envelope: self.filter_envelope.load(),
            cutoff: self.cutoff.load(Ordering::Relaxed),
            resonance: self.resonance.load(Ordering::Relaxed),
            env_amount: self.env_amount.load(Ordering::Relaxed),
            waveform: Waveform::from_index(self.waveform.load(Ordering::Relaxed)),
            unison_voices: self.unison_voices.load(Ordering::Relaxed),
            detune: self.detune.load(Ordering::Relaxed),
            stereo_width: self.stereo_width.load(Ordering::Relaxed),
            noise_enabled: self.noise_enabled.load(Ordering::Relaxed),
            noise_level: self.noise_level.load(Ordering::Relaxed),
        }
    }

    pub fn set_cutoff(&self, hz: f32) {
        self.cutoff.store(hz.clamp(20.0, 20000.0), Ordering::Relaxed);
    }

    pub fn set_resonance(&self, q: f32) {
        self.resonance.store(q.clamp(0.1, 10.0), Ordering::Relaxed);
    }

    pub fn set_env_amount(&self, amount: f32) {
        self.env_amount.store(amount.clamp(-100.0, 100.0), Ordering::Relaxed);
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        self.waveform.store(waveform.index(), Ordering::Relaxed);
    }

    pub fn set_unison_voices(&self, voices: i32) {
        self.unison_voices
            .store(voices.clamp(1, 7), Ordering::Relaxed);
    }

    pub fn set_detune(&self, amount: f32) {
        self.detune.store(amount.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn set_stereo_width(&self, width: f32) {
        self.stereo_width.store(width.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn set_noise(&self, enabled: bool, level: f32) {
        self.noise_enabled.store(enabled, Ordering::Relaxed);
        self.noise_level.store(level.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn set_amp_envelope(&self, params: EnvelopeParams) {
        self.amp_envelope.store(params.clamped());
    }

    pub fn set_filter_envelope(&self, params: EnvelopeParams) {
        self.filter_envelope.store(params.clamped());
    }
}
