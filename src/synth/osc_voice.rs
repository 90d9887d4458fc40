//! Oscillator voice
//!
//! One playing note: unison bank -> amp envelope -> modulated filter ->
//! soft clip -> noise, accumulated into a shared stereo buffer.

use super::voice::midi_note_to_hz;
use super::{
    AudioBuffer, EnvelopeGenerator, ModulatedFilter, SynthParams, UnisonOscillator,
    VintageProcessor, Voice, VoiceKind,
};

/// Velocity-to-level scale, leaving headroom for several voices
const VELOCITY_HEADROOM: f32 = 0.15;

/// A polyphonic voice built on the unison oscillator bank
#[derive(Debug, Clone)]
pub struct OscillatorVoice {
    bank: UnisonOscillator,
    amp_envelope: EnvelopeGenerator,
    filter_envelope: EnvelopeGenerator,
    filter: ModulatedFilter,
    vintage: VintageProcessor,

    sample_rate: f64,
    num_channels: usize,
    frequency: f64,
    level: f32,
    note: Option<u8>,

    noise_enabled: bool,
    noise_level: f32,
}

impl OscillatorVoice {
    /// Create an idle voice. `seed` gives each voice its own noise stream.
    pub fn new(sample_rate: f64, seed: u64) -> Self {
        Self {
            bank: UnisonOscillator::new(),
            amp_envelope: EnvelopeGenerator::new(sample_rate as f32),
            filter_envelope: EnvelopeGenerator::new(sample_rate as f32),
            filter: ModulatedFilter::new(sample_rate, 2),
            vintage: VintageProcessor::new(seed),
            sample_rate,
            num_channels: 2,
            frequency: 440.0,
            level: 0.0,
            note: None,
            noise_enabled: false,
            noise_level: 0.3,
        }
    }

    /// Velocity-derived amplitude of the current note
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Base frequency of the current note in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn amp_envelope(&self) -> &EnvelopeGenerator {
        &self.amp_envelope
    }

    pub fn filter_envelope(&self) -> &EnvelopeGenerator {
        &self.filter_envelope
    }

    pub fn filter(&self) -> &ModulatedFilter {
        &self.filter
    }

    /// Return to the idle pool
    fn reclaim(&mut self) {
        self.amp_envelope.reset();
        self.filter_envelope.reset();
        self.note = None;
    }
}

impl Voice for OscillatorVoice {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Oscillator
    }

    fn prepare(&mut self, sample_rate: f64, _block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.num_channels = num_channels;
        self.amp_envelope.set_sample_rate(sample_rate as f32);
        self.filter_envelope.set_sample_rate(sample_rate as f32);
        self.filter.prepare(sample_rate, num_channels);
        self.reclaim();
    }

    fn apply_params(&mut self, params: &SynthParams) {
        self.amp_envelope.set_params(params.amp_envelope);
        self.filter_envelope.set_params(params.filter_envelope);

        self.filter.set_base_cutoff(params.cutoff);
        self.filter.set_resonance(params.resonance);
        self.filter.set_env_amount(params.env_amount);

        self.bank.set_waveform(params.waveform);
        self.bank.set_voices(params.unison_voices);
        self.bank.set_detune(params.detune);
        self.bank.set_stereo_width(params.stereo_width);

        self.noise_enabled = params.noise_enabled;
        self.noise_level = params.noise_level.clamp(0.0, 1.0);
    }

    fn start_note(&mut self, midi_note: u8, velocity: f32) {
        self.frequency = midi_note_to_hz(midi_note);
        self.bank.set_frequency(self.frequency, self.sample_rate);
        self.level = velocity.clamp(0.0, 1.0) * VELOCITY_HEADROOM;
        self.bank.reset();
        self.amp_envelope.note_on();
        self.filter_envelope.note_on();
        self.note = Some(midi_note);
    }

    fn stop_note(&mut self, allow_tail_off: bool) {
        self.amp_envelope.note_off();
        self.filter_envelope.note_off();

        if !allow_tail_off || !self.amp_envelope.is_active() {
            self.reclaim();
        }
    }

    fn is_active(&self) -> bool {
        self.amp_envelope.is_active()
    }

    fn current_note(&self) -> Option<u8> {
        self.note
    }

    fn render_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.amp_envelope.is_active() {
            return;
        }

        // Slow analog pitch wander, also picks up unison changes from apply_params
        let drift = self.vintage.drift_amount(self.sample_rate) as f64;
        self.bank
            .set_frequency(self.frequency * (1.0 + drift), self.sample_rate);

        let stereo = buffer.num_channels() > 1;
        let end = (start_sample + num_samples).min(buffer.num_samples());

        for index in start_sample..end {
            let env = self.amp_envelope.next_sample();
            let filter_env = self.filter_envelope.next_sample();
            self.filter.modulate(filter_env);

            let (raw_left, raw_right) = self.bank.next_sample_stereo();
            let gain = self.level * env;

            let left = self.filter.process_sample(0, raw_left * gain);
            let left = VintageProcessor::soft_clip(left);

            // Noise follows the amp envelope so it fades with the note
            let noise = self
                .vintage
                .analog_noise(self.noise_enabled, self.noise_level)
                * env;

            buffer.add_sample(0, index, left + noise);

            if stereo {
                let right = self.filter.process_sample(1, raw_right * gain);
                let right = VintageProcessor::soft_clip(right);
                buffer.add_sample(1, index, right + noise);
            }
        }

        if !self.amp_envelope.is_active() {
            self.reclaim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{EnvelopeParams, EnvelopeStage, Waveform};

    const SR: f64 = 44100.0;

    fn sine_params() -> SynthParams {
        SynthParams {
            waveform: Waveform::Sine,
            unison_voices: 1,
            ..SynthParams::default()
        }
    }

    fn voice_with(params: &SynthParams) -> OscillatorVoice {
        let mut voice = OscillatorVoice::new(SR, 1);
        voice.prepare(SR, 512, 2);
        voice.apply_params(params);
        voice
    }

    #[test]
    fn test_kind_and_idle_state() {
        let voice = OscillatorVoice::new(SR, 1);
        assert_eq!(voice.kind(), VoiceKind::Oscillator);
        assert!(!voice.is_active());
        assert_eq!(voice.current_note(), None);
    }

    #[test]
    fn test_start_note_sets_level_and_frequency() {
        let mut voice = voice_with(&sine_params());
        voice.start_note(69, 1.0);
        assert!(voice.is_active());
        assert_eq!(voice.current_note(), Some(69));
        assert!((voice.level() - 0.15).abs() < 1e-7);
        assert!((voice.frequency() - 440.0).abs() < 1e-9);
        assert_eq!(voice.amp_envelope().stage(), EnvelopeStage::Attack);
        assert_eq!(voice.filter_envelope().stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn test_first_sample_is_zero_for_sine() {
        let mut voice = voice_with(&sine_params());
        let mut buffer = AudioBuffer::new(2, 64);
        voice.start_note(69, 1.0);
        voice.render_block(&mut buffer, 0, 64);

        assert_eq!(buffer.channel(0)[0], 0.0);
        assert_eq!(buffer.channel(1)[0], 0.0);
        assert!(buffer.peak() > 0.0);
    }

    #[test]
    fn test_panic_stop_is_immediate() {
        let mut voice = voice_with(&sine_params());
        let mut buffer = AudioBuffer::new(2, 256);
        voice.start_note(60, 0.8);
        voice.render_block(&mut buffer, 0, 256);

        voice.stop_note(false);
        assert!(!voice.is_active());
        assert_eq!(voice.current_note(), None);

        buffer.clear();
        voice.render_block(&mut buffer, 0, 256);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_tail_off_releases_then_reclaims() {
        let params = SynthParams {
            amp_envelope: EnvelopeParams::new(0.01, 0.01, 0.8, 0.05),
            ..sine_params()
        };
        let mut voice = voice_with(&params);
        let mut buffer = AudioBuffer::new(2, 512);
        voice.start_note(60, 1.0);
        voice.render_block(&mut buffer, 0, 512);

        voice.stop_note(true);
        assert!(voice.is_active());
        assert_eq!(voice.amp_envelope().stage(), EnvelopeStage::Release);
        assert_eq!(voice.current_note(), Some(60));

        // 50 ms release is about 2205 samples
        for _ in 0..6 {
            voice.render_block(&mut buffer, 0, 512);
        }
        assert!(!voice.is_active());
        assert_eq!(voice.current_note(), None);
    }

    #[test]
    fn test_stop_idle_voice_reclaims() {
        let mut voice = voice_with(&sine_params());
        voice.stop_note(true);
        assert!(!voice.is_active());
        assert_eq!(voice.current_note(), None);
    }

    #[test]
    fn test_inactive_voice_leaves_buffer_untouched() {
        let mut voice = voice_with(&sine_params());
        let mut buffer = AudioBuffer::new(2, 32);
        buffer.channel_mut(0).fill(0.25);
        voice.render_block(&mut buffer, 0, 32);
        assert!(buffer.channel(0).iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_render_accumulates() {
        let params = SynthParams {
            waveform: Waveform::Saw,
            ..sine_params()
        };
        let mut alone = voice_with(&params);
        let mut shared = voice_with(&params);

        let mut clean = AudioBuffer::new(2, 128);
        alone.start_note(64, 1.0);
        alone.render_block(&mut clean, 0, 128);

        let mut offset = AudioBuffer::new(2, 128);
        offset.channel_mut(0).fill(0.5);
        offset.channel_mut(1).fill(0.5);
        shared.start_note(64, 1.0);
        shared.render_block(&mut offset, 0, 128);

        for i in 0..128 {
            let diff = offset.channel(0)[i] - 0.5 - clean.channel(0)[i];
            assert!(diff.abs() < 1e-6);
        }
    }

    #[test]
    fn test_render_respects_start_offset() {
        let mut voice = voice_with(&SynthParams {
            waveform: Waveform::Square,
            ..sine_params()
        });
        let mut buffer = AudioBuffer::new(2, 64);
        voice.start_note(72, 1.0);
        voice.render_block(&mut buffer, 32, 32);
        assert!(buffer.channel(0)[..32].iter().all(|&s| s == 0.0));
        assert!(buffer.channel(0)[33..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_output_bounded_by_soft_clip_and_noise() {
        let params = SynthParams {
            waveform: Waveform::Square,
            unison_voices: 7,
            resonance: 10.0,
            noise_enabled: true,
            noise_level: 1.0,
            ..SynthParams::default()
        };
        let mut voice = voice_with(&params);
        let mut buffer = AudioBuffer::new(2, 4096);
        voice.start_note(40, 1.0);
        voice.render_block(&mut buffer, 0, 4096);
        // 0.8 from the clipper plus at most 0.03 of noise
        assert!(buffer.peak() <= 0.83 + 1e-6);
    }

    #[test]
    fn test_mono_buffer_matches_left_channel() {
        let params = SynthParams {
            waveform: Waveform::Saw,
            ..sine_params()
        };
        let mut mono_voice = OscillatorVoice::new(SR, 9);
        mono_voice.prepare(SR, 128, 1);
        mono_voice.apply_params(&params);
        let mut stereo_voice = OscillatorVoice::new(SR, 9);
        stereo_voice.prepare(SR, 128, 2);
        stereo_voice.apply_params(&params);

        let mut mono = AudioBuffer::new(1, 128);
        let mut stereo = AudioBuffer::new(2, 128);
        mono_voice.start_note(60, 1.0);
        stereo_voice.start_note(60, 1.0);
        mono_voice.render_block(&mut mono, 0, 128);
        stereo_voice.render_block(&mut stereo, 0, 128);

        assert!(mono.peak() > 0.0);
        assert_eq!(mono.channel(0), stereo.channel(0));
    }

    #[test]
    fn test_channels_beyond_stereo_untouched() {
        let mut voice = OscillatorVoice::new(SR, 3);
        voice.prepare(SR, 128, 3);
        voice.apply_params(&SynthParams {
            waveform: Waveform::Saw,
            ..sine_params()
        });
        let mut buffer = AudioBuffer::new(3, 128);
        for ch in 0..3 {
            buffer.channel_mut(ch).fill(0.5);
        }
        voice.start_note(60, 1.0);
        voice.render_block(&mut buffer, 0, 128);

        assert!(buffer.channel(0).iter().any(|&s| s != 0.5));
        assert!(buffer.channel(1).iter().any(|&s| s != 0.5));
        assert!(buffer.channel(2).iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_noise_follows_amp_envelope() {
        // 20 Hz cutoff under note 127 leaves almost only the noise
        let params = SynthParams {
            amp_envelope: EnvelopeParams::new(0.1, 0.1, 0.8, 0.05),
            cutoff: 20.0,
            env_amount: 0.0,
            noise_enabled: true,
            noise_level: 1.0,
            ..sine_params()
        };
        let mut voice = voice_with(&params);
        let mut buffer = AudioBuffer::new(2, 512);
        voice.start_note(127, 1.0);

        voice.render_block(&mut buffer, 0, 512);
        let early = buffer.channel(0)[..32]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));

        // Past attack and decay (0.2 s) into sustain
        for _ in 0..25 {
            buffer.clear();
            voice.render_block(&mut buffer, 0, 512);
        }
        assert_eq!(voice.amp_envelope().stage(), EnvelopeStage::Sustain);
        let sustain = buffer.peak();

        assert!(early < 0.001, "early peak {}", early);
        assert!(sustain > 0.01, "sustain peak {}", sustain);
        assert!(early * 10.0 < sustain);

        // Silent once the release has finished
        voice.stop_note(true);
        for _ in 0..6 {
            buffer.clear();
            voice.render_block(&mut buffer, 0, 512);
        }
        assert!(!voice.is_active());
        buffer.clear();
        voice.render_block(&mut buffer, 0, 512);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_filter_cutoff_tracks_envelope() {
        let params = SynthParams {
            cutoff: 500.0,
            env_amount: 100.0,
            filter_envelope: EnvelopeParams::new(0.01, 5.0, 1.0, 0.5),
            ..sine_params()
        };
        let mut voice = voice_with(&params);
        let mut buffer = AudioBuffer::new(2, 1024);
        voice.start_note(60, 1.0);
        voice.render_block(&mut buffer, 0, 1024);
        // Filter envelope has reached full scale
        assert!((voice.filter().modulated_cutoff() - 5500.0).abs() < 1.0);
    }
}
