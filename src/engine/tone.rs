//! Tone compensation
//!
//! Three fixed biquads in series (40 Hz high-pass, 200 Hz low shelf, 4 kHz
//! peak) and a trim gain, applied to the mixed output. The coefficients are
//! precomputed for 44.1 kHz.

use tracing::warn;

use crate::synth::AudioBuffer;

/// Rate the coefficients were designed at
pub const DESIGN_SAMPLE_RATE: f64 = 44100.0;

/// Gain applied after the filters
const OUTPUT_GAIN: f64 = 0.92;

/// Biquad filter coefficients (a0 normalized to 1)
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

/// Removes sub-bass and DC
const HIGH_PASS_40: Coefficients = Coefficients {
    b0: 0.99114,
    b1: -1.98223,
    b2: 0.99114,
    a1: -1.98223,
    a2: 0.98229,
};

/// Gentle cut around the low mids
const LOW_SHELF_200: Coefficients = Coefficients {
    b0: 0.97067,
    b1: -1.93477,
    b2: 0.96704,
    a1: -1.93477,
    a2: 0.93772,
};

/// Small presence lift
const PEAK_4K: Coefficients = Coefficients {
    b0: 1.03159,
    b1: -1.74453,
    b2: 0.73704,
    a1: -1.74453,
    a2: 0.76863,
};

const STAGES: [Coefficients; 3] = [HIGH_PASS_40, LOW_SHELF_200, PEAK_4K];

/// Filter state (Direct Form II transposed)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadState {
    fn process(&mut self, c: &Coefficients, input: f64) -> f64 {
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Per-channel tone compensation chain
#[derive(Debug, Clone)]
pub struct ToneShaper {
    channels: Vec<[BiquadState; 3]>,
}

impl ToneShaper {
    pub fn new(num_channels: usize) -> Self {
        Self {
            channels: vec![[BiquadState::default(); 3]; num_channels],
        }
    }

    /// Size the state for a stream and clear it
    pub fn prepare(&mut self, sample_rate: f64, num_channels: usize) {
        if (sample_rate - DESIGN_SAMPLE_RATE).abs() > 0.5 {
            warn!(
                sample_rate,
                "Tone compensation is tuned for 44100 Hz, response will be shifted"
            );
        }
        self.channels.clear();
        self.channels.resize(num_channels, [BiquadState::default(); 3]);
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            *state = [BiquadState::default(); 3];
        }
    }

    /// Process one sample. Channels outside the prepared range pass through.
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let Some(states) = self.channels.get_mut(channel) else {
            return input;
        };

        let mut sample = input as f64;
        for (state, coeffs) in states.iter_mut().zip(STAGES.iter()) {
            sample = state.process(coeffs, sample);
        }
        (sample * OUTPUT_GAIN) as f32
    }

    /// Process every channel of a buffer in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.num_channels().min(self.channels.len());
        for channel in 0..channels {
            for sample in buffer.channel_mut(channel) {
                *sample = self.process_sample(channel, *sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Steady-state RMS gain for a sine at `freq`
    fn gain_at(freq: f32) -> f32 {
        let mut shaper = ToneShaper::new(1);
        let sr = DESIGN_SAMPLE_RATE as f32;
        let settle = 44100;
        let measure = 44100;

        let mut in_sq = 0.0f64;
        let mut out_sq = 0.0f64;
        for n in 0..(settle + measure) {
            let x = (2.0 * PI * freq * n as f32 / sr).sin();
            let y = shaper.process_sample(0, x);
            if n >= settle {
                in_sq += (x * x) as f64;
                out_sq += (y * y) as f64;
            }
        }
        (out_sq / in_sq).sqrt() as f32
    }

    #[test]
    fn test_midrange_passes() {
        let gain = gain_at(1000.0);
        assert!(gain > 0.9 && gain < 1.15, "gain {}", gain);
    }

    #[test]
    fn test_low_end_cut() {
        let gain = gain_at(40.0);
        assert!(gain < 0.3, "gain {}", gain);
        assert!(gain_at(200.0) < gain_at(1000.0));
    }

    #[test]
    fn test_stable_on_full_scale_input() {
        let mut shaper = ToneShaper::new(2);
        let mut state = 1u32;
        for _ in 0..200_000 {
            // Cheap LCG noise in [-1, 1]
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let x = (state >> 8) as f32 / (1u32 << 23) as f32 - 1.0;
            let y = shaper.process_sample(0, x);
            assert!(y.is_finite() && y.abs() < 4.0);
        }
    }

    #[test]
    fn test_channels_independent() {
        let mut shaper = ToneShaper::new(2);
        for _ in 0..100 {
            shaper.process_sample(0, 1.0);
        }
        // Right channel has no history yet
        let right = shaper.process_sample(1, 1.0);
        assert!((right - 0.99114 * 0.97067 * 1.03159 * 0.92).abs() < 1e-4);
    }

    #[test]
    fn test_buffer_matches_per_sample() {
        let mut a = ToneShaper::new(2);
        let mut b = ToneShaper::new(2);
        let mut buffer = AudioBuffer::new(2, 64);
        for i in 0..64 {
            buffer.channel_mut(0)[i] = (i as f32 * 0.1).sin();
            buffer.channel_mut(1)[i] = (i as f32 * 0.3).cos();
        }
        let expected_left: Vec<f32> = buffer
            .channel(0)
            .iter()
            .map(|&x| b.process_sample(0, x))
            .collect();

        a.process(&mut buffer);
        for (got, want) in buffer.channel(0).iter().zip(&expected_left) {
            assert!((got - want).abs() < 1e-7);
        }
    }

    #[test]
    fn test_prepare_resizes_and_clears() {
        let mut shaper = ToneShaper::new(2);
        shaper.process_sample(0, 1.0);
        shaper.prepare(48000.0, 3);
        assert_eq!(shaper.num_channels(), 3);
        let first = shaper.process_sample(2, 1.0);
        assert!((first - 0.99114 * 0.97067 * 1.03159 * 0.92).abs() < 1e-4);
        // Unprepared channels pass through
        assert_eq!(shaper.process_sample(7, 0.5), 0.5);
    }

    #[test]
    fn test_reset() {
        let mut shaper = ToneShaper::new(1);
        let first = shaper.process_sample(0, 1.0);
        shaper.process_sample(0, -1.0);
        shaper.reset();
        assert_eq!(shaper.process_sample(0, 1.0), first);
    }
}
