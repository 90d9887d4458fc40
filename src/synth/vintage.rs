//! Analog character: saturation, pitch drift and noise

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Input gain into the saturator
const CLIP_DRIVE: f32 = 1.5;
/// Output trim after saturation
const CLIP_TRIM: f32 = 0.8;
/// Largest drift magnitude, as a fraction of frequency
pub const MAX_DRIFT: f32 = 0.0005;
/// Largest random-walk step per call
const DRIFT_STEP: f32 = 0.0001;
/// Noise amplitude per percent of noise level
const NOISE_SCALE: f32 = 0.0003;

/// Per-voice analog coloration
#[derive(Debug, Clone)]
pub struct VintageProcessor {
    drift: f32,
    rng: StdRng,
}

impl VintageProcessor {
    /// Create a processor with its own random stream
    pub fn new(seed: u64) -> Self {
        Self {
            drift: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Saturate with tanh, trimmed back to a comparable level
    pub fn soft_clip(sample: f32) -> f32 {
        (sample * CLIP_DRIVE).tanh() * CLIP_TRIM
    }

    /// Uniform hiss for one sample. `level` is 0.0-1.0.
    pub fn analog_noise(&mut self, enabled: bool, level: f32) -> f32 {
        if !enabled {
            return 0.0;
        }
        let level = level.clamp(0.0, 1.0);
        self.rng.gen_range(-1.0f32..=1.0) * NOISE_SCALE * level * 100.0
    }

    /// Advance the pitch random walk and return the current offset.
    ///
    /// The result is a frequency fraction in `[-MAX_DRIFT, MAX_DRIFT]` no
    /// matter how often this is called.
    pub fn drift_amount(&mut self, _sample_rate: f64) -> f32 {
        let step = self.rng.gen_range(-0.5f32..0.5) * DRIFT_STEP;
        self.drift = (self.drift + step).clamp(-MAX_DRIFT, MAX_DRIFT);
        self.drift
    }

    /// Current drift without advancing
    pub fn drift(&self) -> f32 {
        self.drift
    }

    /// Center the drift walk
    pub fn reset(&mut self) {
        self.drift = 0.0;
    }
}
