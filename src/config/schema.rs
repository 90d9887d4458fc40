//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::{DEFAULT_FFT_ORDER, DEFAULT_SCOPE_SIZE, MAX_FFT_ORDER, MIN_FFT_ORDER};
use crate::error::SynthError;
use crate::synth::{EnvelopeParams, SynthParams, MAX_UNISON_VOICES};

/// Main configuration for the synthesizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master settings (volume, polyphony, tone shaping)
    #[serde(default)]
    pub master: MasterConfig,

    /// Initial patch
    #[serde(default)]
    pub patch: SynthParams,

    /// Spectrum display settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// MIDI input settings
    #[serde(default)]
    pub midi: MidiConfig,

    /// Notes for offline rendering
    #[serde(default)]
    pub sequence: Vec<SequenceNote>,
}

impl SynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        check_range("audio.sample_rate", self.audio.sample_rate as f64, 8000.0, 192_000.0)?;
        check_range("audio.buffer_size", self.audio.buffer_size as f64, 16.0, 8192.0)?;
        check_range("audio.channels", self.audio.channels as f64, 1.0, 8.0)?;

        // Validate master settings
        check_range("master.volume", self.master.volume as f64, 0.0, 1.0)?;
        check_range("master.polyphony", self.master.polyphony as f64, 1.0, 64.0)?;

        self.validate_patch()?;

        // Validate analyzer settings
        check_range(
            "analyzer.fft_order",
            self.analyzer.fft_order as f64,
            MIN_FFT_ORDER as f64,
            MAX_FFT_ORDER as f64,
        )?;
        check_range("analyzer.scope_size", self.analyzer.scope_size as f64, 1.0, 4096.0)?;
        check_range("analyzer.refresh_hz", self.analyzer.refresh_hz as f64, 1.0, 120.0)?;

        // Validate sequence
        for (i, note) in self.sequence.iter().enumerate() {
            if note.note > 127 {
                bail!(SynthError::InvalidConfig(format!(
                    "sequence[{}].note must be between 0 and 127",
                    i
                )));
            }
            check_range(&format!("sequence[{}].velocity", i), note.velocity as f64, 0.0, 1.0)?;
            if !(note.start >= 0.0) {
                bail!(SynthError::InvalidConfig(format!(
                    "sequence[{}].start must not be negative",
                    i
                )));
            }
            if !(note.duration > 0.0) {
                bail!(SynthError::InvalidConfig(format!(
                    "sequence[{}].duration must be positive",
                    i
                )));
            }
        }

        Ok(())
    }

    fn validate_patch(&self) -> Result<()> {
        let p = &self.patch;
        check_envelope("patch.amp_envelope", &p.amp_envelope)?;
        check_envelope("patch.filter_envelope", &p.filter_envelope)?;
        check_range("patch.cutoff", p.cutoff as f64, 20.0, 20000.0)?;
        check_range("patch.resonance", p.resonance as f64, 0.1, 10.0)?;
        check_range("patch.env_amount", p.env_amount as f64, -100.0, 100.0)?;
        check_range(
            "patch.unison_voices",
            p.unison_voices as f64,
            1.0,
            MAX_UNISON_VOICES as f64,
        )?;
        check_range("patch.detune", p.detune as f64, 0.0, 1.0)?;
        check_range("patch.stereo_width", p.stereo_width as f64, 0.0, 1.0)?;
        check_range("patch.noise_level", p.noise_level as f64, 0.0, 1.0)?;
        Ok(())
    }

    /// Time in seconds at which the last sequenced note is released
    pub fn sequence_end(&self) -> f64 {
        self.sequence
            .iter()
            .map(|n| n.start + n.duration)
            .fold(0.0, f64::max)
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    // Written so NaN fails too
    if !(value >= min && value <= max) {
        bail!(SynthError::InvalidConfig(format!(
            "{} must be between {} and {} (got {})",
            name, min, max, value
        )));
    }
    Ok(())
}

fn check_envelope(name: &str, env: &EnvelopeParams) -> Result<()> {
    check_range(&format!("{}.attack", name), env.attack as f64, 0.01, 5.0)?;
    check_range(&format!("{}.decay", name), env.decay as f64, 0.01, 5.0)?;
    check_range(&format!("{}.sustain", name), env.sustain as f64, 0.0, 1.0)?;
    check_range(&format!("{}.release", name), env.release as f64, 0.01, 5.0)?;
    Ok(())
}

/// Audio output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Largest render block in frames (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output channels (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            channels: default_channels(),
            device: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }
fn default_channels() -> u16 { 2 }

/// Master settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.8)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Number of voices in the pool (default: 8)
    #[serde(default = "default_polyphony")]
    pub polyphony: usize,

    /// Apply the fixed tone-compensation filters (default: true)
    #[serde(default = "default_tone_shaping")]
    pub tone_shaping: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            polyphony: default_polyphony(),
            tone_shaping: default_tone_shaping(),
        }
    }
}

fn default_volume() -> f32 { 0.8 }
fn default_polyphony() -> usize { 8 }
fn default_tone_shaping() -> bool { true }

/// Spectrum display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// FFT size as a power of two (default: 11, 2048 points)
    #[serde(default = "default_fft_order")]
    pub fft_order: u32,

    /// Number of display bins (default: 512)
    #[serde(default = "default_scope_size")]
    pub scope_size: usize,

    /// Display refresh rate in Hz (default: 30)
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_order: default_fft_order(),
            scope_size: default_scope_size(),
            refresh_hz: default_refresh_hz(),
        }
    }
}

fn default_fft_order() -> u32 { DEFAULT_FFT_ORDER }
fn default_scope_size() -> usize { DEFAULT_SCOPE_SIZE }
fn default_refresh_hz() -> u32 { 30 }

/// MIDI input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Listen for MIDI input while playing (default: true)
    #[serde(default = "default_midi_enabled")]
    pub enabled: bool,

    /// Substring of the input port name (None = first port)
    #[serde(default)]
    pub port: Option<String>,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            enabled: default_midi_enabled(),
            port: None,
        }
    }
}

fn default_midi_enabled() -> bool { true }

/// One note of an offline sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceNote {
    /// MIDI note number
    pub note: u8,

    /// Velocity 0.0-1.0 (default: 0.8)
    #[serde(default = "default_velocity")]
    pub velocity: f32,

    /// Start time in seconds
    pub start: f64,

    /// Held time in seconds, before the release stage
    pub duration: f64,
}

fn default_velocity() -> f32 { 0.8 }
