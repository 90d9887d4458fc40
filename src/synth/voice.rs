//! Voice capability trait
//!
//! The note router talks to voices only through this trait. Each
//! implementation reports its kind through `kind()` instead of being
//! downcast.

use super::{AudioBuffer, SynthParams};

/// Which family of sound generator a voice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    /// Unison oscillator bank through an envelope-modulated filter
    Oscillator,
}

/// Trait for voice implementations
pub trait Voice: Send {
    /// What kind of voice this is
    fn kind(&self) -> VoiceKind;

    /// Size internal state for a stream. Must be called before rendering.
    fn prepare(&mut self, sample_rate: f64, block_size: usize, num_channels: usize);

    /// Apply the control snapshot for the coming block
    fn apply_params(&mut self, params: &SynthParams);

    /// Start a note. `velocity` is 0.0-1.0.
    fn start_note(&mut self, midi_note: u8, velocity: f32);

    /// Release the note. Without tail-off the voice is reclaimed at once.
    fn stop_note(&mut self, allow_tail_off: bool);

    /// True while the voice is producing sound
    fn is_active(&self) -> bool;

    /// The note this voice was started with, until it is reclaimed
    fn current_note(&self) -> Option<u8>;

    /// Add `num_samples` frames of output into `buffer` from `start_sample`
    fn render_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize);
}

/// Equal-temperament frequency of a MIDI note (A4 = 69 = 440 Hz)
pub fn midi_note_to_hz(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}
