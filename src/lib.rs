//! Analogue - Polyphonic virtual-analog synthesizer
//!
//! Unison oscillators through an envelope-swept filter and vintage
//! coloration, played live from MIDI or rendered offline, with a
//! spectrum display fed from the audio thread.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod synth;
pub mod viz;

pub use config::SynthConfig;
pub use engine::Engine;
pub use error::SynthError;
