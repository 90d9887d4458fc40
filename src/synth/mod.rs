//! Synthesis engine for generating audio
//!
//! Contains oscillators, filters, envelopes, and voice implementations.

mod buffer;
mod envelope;
mod filter;
mod osc_voice;
mod oscillator;
mod params;
mod unison;
mod vintage;
mod voice;

pub use buffer::AudioBuffer;
pub use envelope::{EnvelopeGenerator, EnvelopeParams, EnvelopeStage};
pub use filter::{ModulatedFilter, StateVariableFilter};
pub use osc_voice::OscillatorVoice;
pub use oscillator::{poly_blep, Oscillator, Waveform};
pub use params::{AtomicF32, SharedParams, SynthParams};
pub use unison::{UnisonOscillator, MAX_UNISON_VOICES};
pub use vintage::VintageProcessor;
pub use voice::{midi_note_to_hz, Voice, VoiceKind};
