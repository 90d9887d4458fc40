//! Envelope-modulated resonant low-pass filter
//!
//! A topology-preserving-transform state-variable filter. Integrator state
//! is kept per channel and sized by `prepare`.

use std::f64::consts::PI;

/// Lowest cutoff in Hz
pub const MIN_CUTOFF: f32 = 20.0;
/// Highest cutoff in Hz
pub const MAX_CUTOFF: f32 = 20000.0;
/// Cutoff swing at full envelope and 100% amount, in Hz
pub const ENV_RANGE_HZ: f32 = 5000.0;

/// Integrator state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    s1: f32,
    s2: f32,
}

/// State-variable low-pass filter (trapezoidal integrators)
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    sample_rate: f64,
    cutoff: f32,
    resonance: f32,

    // Coefficients
    g: f32,
    r2: f32,
    h: f32,

    channels: Vec<ChannelState>,
}

impl StateVariableFilter {
    pub fn new(sample_rate: f64, num_channels: usize) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff: 1000.0,
            resonance: 1.0 / std::f32::consts::SQRT_2,
            g: 0.0,
            r2: 0.0,
            h: 0.0,
            channels: vec![ChannelState::default(); num_channels],
        };
        filter.calculate_coefficients();
        filter
    }

    /// Set sample rate and channel count, clearing all history
    pub fn prepare(&mut self, sample_rate: f64, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.channels.clear();
        self.channels.resize(num_channels, ChannelState::default());
        self.calculate_coefficients();
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Set cutoff in Hz. Kept below Nyquist so the prewarp stays finite.
    pub fn set_cutoff(&mut self, hz: f32) {
        let nyquist_limit = (self.sample_rate * 0.49) as f32;
        let hz = hz.clamp(MIN_CUTOFF, MAX_CUTOFF.min(nyquist_limit));
        if hz != self.cutoff {
            self.cutoff = hz;
            self.calculate_coefficients();
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set resonance (Q). 0.707 is flat, higher values peak at the cutoff.
    pub fn set_resonance(&mut self, q: f32) {
        let q = q.clamp(0.1, 10.0);
        if q != self.resonance {
            self.resonance = q;
            self.calculate_coefficients();
        }
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Clear the history of every channel
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            *state = ChannelState::default();
        }
    }

    fn calculate_coefficients(&mut self) {
        let g = (PI * self.cutoff as f64 / self.sample_rate).tan() as f32;
        let r2 = 1.0 / self.resonance;
        self.g = g;
        self.r2 = r2;
        self.h = 1.0 / (1.0 + r2 * g + g * g);
    }

    /// Filter one sample on `channel`. Channels outside the prepared range pass through.
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let (g, r2, h) = (self.g, self.r2, self.h);
        let Some(state) = self.channels.get_mut(channel) else {
            return input;
        };

        let high = h * (input - state.s1 * (r2 + g) - state.s2);
        let band = high * g + state.s1;
        state.s1 = high * g + band;
        let low = band * g + state.s2;
        state.s2 = band * g + low;

        low
    }
}

/// Low-pass whose cutoff follows an envelope around a base value
#[derive(Debug, Clone)]
pub struct ModulatedFilter {
    filter: StateVariableFilter,
    base_cutoff: f32,
    env_amount: f32,
    modulated_cutoff: f32,
}

impl ModulatedFilter {
    pub fn new(sample_rate: f64, num_channels: usize) -> Self {
        Self {
            filter: StateVariableFilter::new(sample_rate, num_channels),
            base_cutoff: 1000.0,
            env_amount: 0.0,
            modulated_cutoff: 1000.0,
        }
    }

    /// Resize per-channel state for a new stream and clear it
    pub fn prepare(&mut self, sample_rate: f64, num_channels: usize) {
        self.filter.prepare(sample_rate, num_channels);
    }

    pub fn set_base_cutoff(&mut self, hz: f32) {
        self.base_cutoff = hz.clamp(MIN_CUTOFF, MAX_CUTOFF);
    }

    pub fn base_cutoff(&self) -> f32 {
        self.base_cutoff
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.filter.set_resonance(q);
    }

    pub fn resonance(&self) -> f32 {
        self.filter.resonance()
    }

    /// Envelope depth in percent, -100 to 100
    pub fn set_env_amount(&mut self, amount: f32) {
        self.env_amount = amount.clamp(-100.0, 100.0);
    }

    pub fn env_amount(&self) -> f32 {
        self.env_amount
    }

    /// Cutoff for a given filter-envelope value, without touching the filter
    pub fn cutoff_for(&self, env_value: f32) -> f32 {
        let modulation = env_value * (self.env_amount / 100.0) * ENV_RANGE_HZ;
        (self.base_cutoff + modulation).clamp(MIN_CUTOFF, MAX_CUTOFF)
    }

    /// Recompute the cutoff from this sample's envelope value
    pub fn modulate(&mut self, env_value: f32) {
        self.modulated_cutoff = self.cutoff_for(env_value);
        self.filter.set_cutoff(self.modulated_cutoff);
    }

    /// Cutoff computed by the last `modulate` call
    pub fn modulated_cutoff(&self) -> f32 {
        self.modulated_cutoff
    }

    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        self.filter.process_sample(channel, input)
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_rms(filter: &mut StateVariableFilter, freq: f64, sample_rate: f64) -> f64 {
        let mut sum_sq = 0.0;
        let total = 8820;
        // Whole cycles of 100 Hz after settling
        let settle = 2205;
        for i in 0..total {
            let t = i as f64 / sample_rate;
            let input = (2.0 * PI * freq * t).sin() as f32;
            let output = filter.process_sample(0, input) as f64;
            if i >= settle {
                sum_sq += output * output;
            }
        }
        (sum_sq / (total - settle) as f64).sqrt()
    }

    #[test]
    fn test_lowpass_attenuates_high_frequencies() {
        let mut filter = StateVariableFilter::new(44100.0, 1);
        filter.set_cutoff(200.0);
        let rms = sine_rms(&mut filter, 8000.0, 44100.0);
        assert!(rms < 0.01, "rms {}", rms);
    }

    #[test]
    fn test_lowpass_passes_low_frequencies() {
        let mut filter = StateVariableFilter::new(44100.0, 1);
        filter.set_cutoff(5000.0);
        let rms = sine_rms(&mut filter, 100.0, 44100.0);
        let ratio = rms / std::f64::consts::FRAC_1_SQRT_2;
        assert!(ratio > 0.95 && ratio < 1.05, "ratio {}", ratio);
    }

    #[test]
    fn test_resonance_boosts_cutoff() {
        let mut flat = StateVariableFilter::new(44100.0, 1);
        flat.set_cutoff(1000.0);
        flat.set_resonance(0.707);
        let mut peaky = StateVariableFilter::new(44100.0, 1);
        peaky.set_cutoff(1000.0);
        peaky.set_resonance(8.0);

        let flat_rms = sine_rms(&mut flat, 1000.0, 44100.0);
        let peak_rms = sine_rms(&mut peaky, 1000.0, 44100.0);
        assert!(peak_rms > flat_rms * 4.0);
    }

    #[test]
    fn test_stable_at_extremes() {
        let mut filter = StateVariableFilter::new(44100.0, 2);
        filter.set_resonance(10.0);
        for cutoff in [20.0, 19_999.0, 20_000.0] {
            filter.set_cutoff(cutoff);
            for i in 0..10_000 {
                let input = if i % 50 < 25 { 1.0 } else { -1.0 };
                let out = filter.process_sample(i % 2, input);
                assert!(out.is_finite() && out.abs() < 100.0);
            }
        }
    }

    #[test]
    fn test_cutoff_kept_below_nyquist() {
        let mut filter = StateVariableFilter::new(22050.0, 1);
        filter.set_cutoff(20000.0);
        assert!(filter.cutoff() < 11025.0);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut filter = StateVariableFilter::new(44100.0, 2);
        filter.set_cutoff(500.0);
        for _ in 0..100 {
            filter.process_sample(0, 1.0);
        }
        assert_eq!(filter.process_sample(1, 0.0), 0.0);
    }

    #[test]
    fn test_prepare_resizes_and_clears() {
        let mut filter = StateVariableFilter::new(44100.0, 2);
        for _ in 0..100 {
            filter.process_sample(0, 1.0);
        }
        filter.prepare(48000.0, 4);
        assert_eq!(filter.num_channels(), 4);
        assert_eq!(filter.process_sample(0, 0.0), 0.0);
        // Unknown channel passes straight through
        assert_eq!(filter.process_sample(9, 0.25), 0.25);
    }

    #[test]
    fn test_resonance_clamping() {
        let mut filter = ModulatedFilter::new(44100.0, 2);
        filter.set_resonance(0.01);
        assert_eq!(filter.resonance(), 0.1);
        filter.set_resonance(50.0);
        assert_eq!(filter.resonance(), 10.0);
    }

    #[test]
    fn test_modulated_cutoff_in_range() {
        let mut filter = ModulatedFilter::new(44100.0, 2);
        for base in [20.0, 500.0, 10_000.0, 20_000.0] {
            filter.set_base_cutoff(base);
            for amount in (-100..=100).step_by(10) {
                filter.set_env_amount(amount as f32);
                for step in 0..=20 {
                    let env = step as f32 / 20.0;
                    filter.modulate(env);
                    let cutoff = filter.modulated_cutoff();
                    assert!((MIN_CUTOFF..=MAX_CUTOFF).contains(&cutoff));
                }
            }
        }
    }

    #[test]
    fn test_env_amount_direction() {
        let mut filter = ModulatedFilter::new(44100.0, 2);
        filter.set_base_cutoff(1000.0);

        filter.set_env_amount(80.0);
        assert!((filter.cutoff_for(1.0) - 5000.0).abs() < 0.01);
        assert_eq!(filter.cutoff_for(0.0), 1000.0);

        filter.set_env_amount(-100.0);
        assert!((filter.cutoff_for(0.1) - 500.0).abs() < 0.01);
        assert_eq!(filter.cutoff_for(1.0), MIN_CUTOFF);

        filter.set_env_amount(250.0);
        assert_eq!(filter.env_amount(), 100.0);
    }
}
