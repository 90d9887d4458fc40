//! Offline rendering of a note sequence to a WAV file

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use super::{Engine, NoteEvent, Recorder};
use crate::config::{SequenceNote, SynthConfig};
use crate::synth::AudioBuffer;

/// Expand a sequence into frame-stamped note events, sorted by time.
/// At equal times releases come before starts.
pub fn sequence_events(sequence: &[SequenceNote], sample_rate: u32) -> Vec<(u64, NoteEvent)> {
    let to_frame = |secs: f64| (secs.max(0.0) * sample_rate as f64).round() as u64;

    let mut events: Vec<(u64, NoteEvent)> = sequence
        .iter()
        .flat_map(|n| {
            [
                (
                    to_frame(n.start),
                    NoteEvent::NoteOn {
                        note: n.note,
                        velocity: n.velocity,
                    },
                ),
                (
                    to_frame(n.start + n.duration),
                    NoteEvent::NoteOff { note: n.note },
                ),
            ]
        })
        .collect();

    events.sort_by_key(|(frame, event)| (*frame, matches!(event, NoteEvent::NoteOn { .. })));
    events
}

/// Render `config.sequence` with `config.patch` to a float WAV file with
/// `config.audio.channels` channels (voices render at most stereo),
/// continuing for `tail_secs` after the last release. Returns the number of
/// frames written.
pub fn render_sequence(config: &SynthConfig, output: &Path, tail_secs: f64) -> Result<u64> {
    let sample_rate = config.audio.sample_rate;
    let block = config.audio.buffer_size.max(1);
    let file_channels = config.audio.channels.max(1);
    let render_channels = (file_channels as usize).min(2);

    let mut engine = Engine::new(config);
    engine.prepare(sample_rate as f64, block, render_channels);

    let events = sequence_events(&config.sequence, sample_rate);
    let length_secs = config.sequence_end() + tail_secs.max(0.0);
    let total_frames = (length_secs * sample_rate as f64).ceil() as u64;

    info!(
        notes = config.sequence.len(),
        seconds = length_secs,
        path = %output.display(),
        "Rendering sequence"
    );

    let mut recorder = Recorder::new(output, sample_rate, file_channels)?;
    let mut buffer = AudioBuffer::new(render_channels, block);
    let mut frame = 0u64;
    let mut next_event = 0;
    let mut next_report = sample_rate as u64;

    while frame < total_frames {
        while let Some(&(at, event)) = events.get(next_event) {
            if at > frame {
                break;
            }
            engine.handle_event(event);
            next_event += 1;
        }

        // Split blocks at event times so notes start on their exact frame
        let until_event = events
            .get(next_event)
            .map_or(u64::MAX, |&(at, _)| at - frame);
        let len = (block as u64).min(total_frames - frame).min(until_event) as usize;

        buffer.set_len(len);
        engine.render_block(&mut buffer, &config.patch);
        recorder.write_buffer(&buffer)?;
        frame += len as u64;

        if frame >= next_report {
            debug!(
                seconds = frame / sample_rate as u64,
                voices = engine.active_voices(),
                "Render progress"
            );
            next_report += sample_rate as u64;
        }
    }

    recorder.finalize()?;
    info!(frames = total_frames, "Render finished");

    Ok(total_frames)
}
