//! Analogue - Polyphonic virtual-analog synthesizer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use analogue::analyzer::spectrum_channel;
use analogue::config::{self, SynthConfig, EXAMPLE_CONFIG};
use analogue::engine::{
    default_device_name, list_midi_inputs, list_output_devices, note_queue, render_sequence,
    Engine, MidiListener, Player,
};
use analogue::synth::SharedParams;
use analogue::viz::{run_viz, Controls};
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

/// Capacity of each note queue feeding the audio thread
const NOTE_QUEUE_CAPACITY: usize = 256;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            no_viz,
        } => {
            info!(path = %config_path.display(), "Loading configuration");
            let cfg = config::load_config(&config_path)?;
            play(&cfg, !no_viz)?;
        }

        Commands::Render {
            config: config_path,
            output,
            tail,
        } => {
            let cfg = config::load_config(&config_path)?;
            if cfg.sequence.is_empty() {
                warn!("Sequence is empty, rendering silence");
            }

            let frames = render_sequence(&cfg, &output, tail)?;
            println!(
                "Rendered {:.2}s to {:?}",
                frames as f64 / cfg.audio.sample_rate as f64,
                output
            );
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            for (name, config) in list_output_devices() {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }

            println!("\nMIDI inputs:");
            match list_midi_inputs() {
                Ok(ports) if ports.is_empty() => println!("  (none)"),
                Ok(ports) => {
                    for port in ports {
                        println!("  - {}", port);
                    }
                }
                Err(e) => println!("  Error listing MIDI inputs: {}", e),
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => print_summary(&cfg),
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = "analogue.yaml";
            if std::path::Path::new(path).exists() {
                println!("analogue.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created analogue.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

fn play(cfg: &SynthConfig, show_viz: bool) -> Result<()> {
    let mut engine = Engine::new(cfg);
    let (analyzer, reader) = spectrum_channel(cfg.analyzer.fft_order, cfg.analyzer.scope_size);
    engine.attach_analyzer(analyzer);

    let params = Arc::new(SharedParams::new(&cfg.patch));
    let (key_tx, key_rx) = note_queue(NOTE_QUEUE_CAPACITY);
    let mut receivers = vec![key_rx];

    // Keep the connection alive for the whole session
    let _midi = if cfg.midi.enabled {
        let (midi_tx, midi_rx) = note_queue(NOTE_QUEUE_CAPACITY);
        match MidiListener::connect(cfg.midi.port.as_deref(), midi_tx) {
            Ok(listener) => {
                receivers.push(midi_rx);
                Some(listener)
            }
            Err(e) => {
                warn!("MIDI input unavailable: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut player = Player::new();
    player.start(engine, params.clone(), receivers, &cfg.audio)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let controls = Controls::new(params, key_tx);
    if show_viz {
        run_viz(reader, controls, running, cfg.analyzer.refresh_hz)?;
    } else {
        println!("Playing. Press Ctrl+C to stop.");
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    player.stop();
    info!("Stopped");
    Ok(())
}

fn print_summary(cfg: &SynthConfig) {
    let patch = &cfg.patch;

    println!("Configuration is valid!");
    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
    println!("  Buffer size: {}", cfg.audio.buffer_size);
    println!("  Channels: {}", cfg.audio.channels);
    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
    println!("  Polyphony: {}", cfg.master.polyphony);
    println!(
        "  Tone shaping: {}",
        if cfg.master.tone_shaping { "on" } else { "off" }
    );
    println!(
        "  Oscillator: {} x{} (detune {:.2}, width {:.2})",
        patch.waveform.name(),
        patch.unison_voices,
        patch.detune,
        patch.stereo_width
    );
    println!(
        "  Filter: {:.0} Hz, Q {:.2}, envelope {:+.0}%",
        patch.cutoff, patch.resonance, patch.env_amount
    );
    println!(
        "  FFT: {} points, {} display bins",
        1usize << cfg.analyzer.fft_order,
        cfg.analyzer.scope_size
    );
    println!(
        "  MIDI: {}",
        match (cfg.midi.enabled, &cfg.midi.port) {
            (false, _) => "disabled".to_string(),
            (true, Some(port)) => format!("port matching {:?}", port),
            (true, None) => "first available port".to_string(),
        }
    );
    println!(
        "  Sequence: {} notes, {:.2}s",
        cfg.sequence.len(),
        cfg.sequence_end()
    );
}
