//! Audio engine
//!
//! Owns the voice pool, routes note events to voices, and mixes them into
//! the output buffer followed by tone compensation and master volume.

mod events;
mod midi;
mod offline;
mod player;
mod recorder;
mod tone;

pub use events::{note_queue, NoteEvent, NoteReceiver, NoteSender};
pub use midi::{list_midi_inputs, MidiListener};
pub use offline::render_sequence;
pub use player::{default_device_name, list_output_devices, Player};
pub use recorder::Recorder;
pub use tone::ToneShaper;

use tracing::{debug, info};

use crate::analyzer::SpectrumAnalyzer;
use crate::config::SynthConfig;
use crate::synth::{AudioBuffer, OscillatorVoice, SynthParams, Voice};

/// The main audio engine
pub struct Engine {
    voices: Vec<Box<dyn Voice>>,
    // Per voice: key still held, and note-on order for stealing
    held: Vec<bool>,
    started: Vec<u64>,
    next_order: u64,

    tone: ToneShaper,
    tone_shaping: bool,
    volume: f32,
    analyzer: Option<SpectrumAnalyzer>,

    sample_rate: f64,
    block_size: usize,
    num_channels: usize,
}

impl Engine {
    /// Create an engine with a pool of `master.polyphony` voices
    pub fn new(config: &SynthConfig) -> Self {
        let sample_rate = config.audio.sample_rate as f64;
        let num_channels = config.audio.channels as usize;
        let polyphony = config.master.polyphony.max(1);

        let voices = (0..polyphony)
            .map(|i| {
                let mut voice = OscillatorVoice::new(sample_rate, i as u64 + 1);
                voice.prepare(sample_rate, config.audio.buffer_size, num_channels);
                voice.apply_params(&config.patch);
                Box::new(voice) as Box<dyn Voice>
            })
            .collect();

        debug!(polyphony, "Voice pool created");

        Self {
            voices,
            held: vec![false; polyphony],
            started: vec![0; polyphony],
            next_order: 0,
            tone: ToneShaper::new(num_channels),
            tone_shaping: config.master.tone_shaping,
            volume: config.master.volume,
            analyzer: None,
            sample_rate,
            block_size: config.audio.buffer_size,
            num_channels,
        }
    }

    /// Configure every voice and the tone shaper for a stream. Silences
    /// all voices.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize, num_channels: usize) {
        info!(sample_rate, block_size, num_channels, "Preparing engine");

        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.num_channels = num_channels;

        for voice in &mut self.voices {
            voice.prepare(sample_rate, block_size, num_channels);
        }
        self.held.fill(false);
        self.tone.prepare(sample_rate, num_channels);
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Largest block size passed to `prepare`
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of voices in the pool
    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    /// Number of voices currently producing sound
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Notes of the sounding voices, in pool order
    pub fn sounding_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.voices
            .iter()
            .filter(|v| v.is_active())
            .filter_map(|v| v.current_note())
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Feed the left channel of every rendered block into `analyzer`
    pub fn attach_analyzer(&mut self, analyzer: SpectrumAnalyzer) {
        self.analyzer = Some(analyzer);
    }

    /// Start a note, retriggering a voice already on it, else taking a free
    /// voice, else stealing the one started earliest
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        let note = note.min(127);
        let index = self
            .voices
            .iter()
            .position(|v| v.current_note() == Some(note))
            .or_else(|| self.voices.iter().position(|v| !v.is_active()))
            .unwrap_or_else(|| self.oldest_voice());

        let voice = &mut self.voices[index];
        if voice.is_active() && voice.current_note() != Some(note) {
            voice.stop_note(false);
        }
        voice.start_note(note, velocity);

        self.held[index] = true;
        self.started[index] = self.next_order;
        self.next_order += 1;
    }

    fn oldest_voice(&self) -> usize {
        self.started
            .iter()
            .enumerate()
            .min_by_key(|&(_, order)| *order)
            .map_or(0, |(i, _)| i)
    }

    /// Release every held voice playing `note`
    pub fn note_off(&mut self, note: u8, allow_tail_off: bool) {
        for (voice, held) in self.voices.iter_mut().zip(self.held.iter_mut()) {
            if *held && voice.current_note() == Some(note) {
                voice.stop_note(allow_tail_off);
                *held = false;
            }
        }
    }

    /// Release all voices. Without tail-off every voice stops at once.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for (voice, held) in self.voices.iter_mut().zip(self.held.iter_mut()) {
            if *held || (!allow_tail_off && voice.is_active()) {
                voice.stop_note(allow_tail_off);
            }
            *held = false;
        }
    }

    /// Apply a queued event
    pub fn handle_event(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { note, velocity } => self.note_on(note, velocity),
            NoteEvent::NoteOff { note } => self.note_off(note, true),
            NoteEvent::AllNotesOff => self.all_notes_off(true),
        }
    }

    /// Apply every event waiting in `receiver`
    pub fn drain_events(&mut self, receiver: &mut NoteReceiver) {
        while let Some(event) = receiver.try_recv() {
            self.handle_event(event);
        }
    }

    /// Render one block into `buffer`, replacing its contents
    pub fn render_block(&mut self, buffer: &mut AudioBuffer, params: &SynthParams) {
        buffer.clear();
        let num_samples = buffer.num_samples();

        for (voice, held) in self.voices.iter_mut().zip(self.held.iter_mut()) {
            voice.apply_params(params);
            voice.render_block(buffer, 0, num_samples);
            if !voice.is_active() {
                *held = false;
            }
        }

        if self.tone_shaping {
            self.tone.process(buffer);
        }
        buffer.apply_gain(self.volume);

        if let Some(analyzer) = &mut self.analyzer {
            if buffer.num_channels() > 0 {
                analyzer.push_block(buffer.channel(0));
            }
        }
    }
}
