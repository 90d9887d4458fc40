//! Real-time audio playback using cpal

use anyhow::{bail, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{Engine, NoteReceiver};
use crate::config::AudioConfig;
use crate::error::SynthError;
use crate::synth::{AudioBuffer, SharedParams};

/// Everything the audio callback owns
struct RenderState {
    engine: Engine,
    params: Arc<SharedParams>,
    receivers: Vec<NoteReceiver>,
    buffer: AudioBuffer,
}

impl RenderState {
    /// Fill one device buffer, rendering in chunks no longer than the
    /// pre-allocated block
    fn render_into<T: cpal::Sample + cpal::FromSample<f32>>(&mut self, data: &mut [T], channels: usize) {
        if channels == 0 {
            return;
        }
        for receiver in &mut self.receivers {
            self.engine.drain_events(receiver);
        }
        let params = self.params.snapshot();

        let block = self.buffer.capacity().max(1);
        for chunk in data.chunks_mut(block * channels) {
            self.buffer.set_len(chunk.len() / channels);
            self.engine.render_block(&mut self.buffer, &params);

            for (frame, slot) in chunk.chunks_mut(channels).enumerate() {
                for (ch, sample) in slot.iter_mut().enumerate() {
                    *sample = T::from_sample(self.buffer.output_sample(frame, ch));
                }
            }
        }
    }
}

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl Player {
    /// Create a new player
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: 0,
        }
    }

    /// Start playing. The engine moves into the audio callback, which drains
    /// `receivers` and snapshots `params` once per device buffer.
    pub fn start(
        &mut self,
        engine: Engine,
        params: Arc<SharedParams>,
        receivers: Vec<NoteReceiver>,
        config: &AudioConfig,
    ) -> Result<()> {
        let host = cpal::default_host();
        let device = match &config.device {
            Some(name) => find_output_device(&host, name)?,
            None => host
                .default_output_device()
                .ok_or(SynthError::NoOutputDevice)?,
        };

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();

        let sample_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels as usize;
        if sample_rate != config.sample_rate {
            warn!(
                requested = config.sample_rate,
                device = sample_rate,
                "Using the device sample rate"
            );
        }

        // Voices only produce stereo; wider devices get silence beyond it
        let render_channels = device_channels.clamp(1, 2);
        let mut engine = engine;
        engine.prepare(sample_rate as f64, config.buffer_size, render_channels);

        let state = RenderState {
            engine,
            params,
            receivers,
            buffer: AudioBuffer::new(render_channels, config.buffer_size),
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, state, running)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, state, running)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, state, running)?,
            other => bail!(SynthError::UnsupportedSampleFormat(format!("{:?}", other))),
        };

        stream.play()?;
        self.stream = Some(stream);
        self.sample_rate = sample_rate;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels = device_channels,
            "Audio output started"
        );

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sample rate of the open stream (0 before `start`)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn find_output_device(host: &cpal::Host, name: &str) -> Result<Device> {
    let devices = host.output_devices()?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    bail!(SynthError::OutputDeviceNotFound(name.to_string()))
}

fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    mut state: RenderState,
    running: Arc<AtomicBool>,
) -> Result<Stream> {
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !running.load(Ordering::Relaxed) {
                // Fill with silence when stopped
                for sample in data.iter_mut() {
                    *sample = T::from_sample(0.0f32);
                }
                return;
            }
            state.render_into(data, channels);
        },
        |err| {
            error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::engine::{note_queue, NoteEvent};
    use crate::synth::SynthParams;

    fn render_state(block: usize) -> (RenderState, crate::engine::NoteSender) {
        let config = SynthConfig::default();
        let mut engine = Engine::new(&config);
        engine.prepare(44100.0, block, 2);
        let (tx, rx) = note_queue(16);
        let state = RenderState {
            engine,
            params: Arc::new(SharedParams::new(&SynthParams::default())),
            receivers: vec![rx],
            buffer: AudioBuffer::new(2, block),
        };
        (state, tx)
    }

    #[test]
    fn test_render_into_drains_queue() {
        let (mut state, mut tx) = render_state(64);
        tx.send(NoteEvent::NoteOn {
            note: 60,
            velocity: 1.0,
        });

        let mut data = vec![0.0f32; 1000 * 2];
        state.render_into(&mut data, 2);
        assert_eq!(state.engine.active_voices(), 1);
        assert!(data.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_device_buffer_longer_than_block() {
        // 300 frames rendered as 128 + 128 + 44
        let (mut state, mut tx) = render_state(128);
        tx.send(NoteEvent::NoteOn {
            note: 72,
            velocity: 1.0,
        });
        let mut data = vec![0.0f32; 300 * 2];
        state.render_into(&mut data, 2);
        assert_eq!(state.buffer.capacity(), 128);
        assert_eq!(state.buffer.num_samples(), 44);
        assert!(data[2 * 299] != 0.0 || data[2 * 298] != 0.0);
    }

    #[test]
    fn test_integer_output_and_extra_channels() {
        let (mut state, mut tx) = render_state(64);
        tx.send(NoteEvent::NoteOn {
            note: 64,
            velocity: 1.0,
        });
        let mut data = vec![0i16; 256 * 4];
        state.render_into(&mut data, 4);
        // Channels 3 and 4 of a quad device stay silent
        assert!(data.chunks(4).all(|f| f[2] == 0 && f[3] == 0));
        assert!(data.chunks(4).any(|f| f[0] != 0));
    }
}
