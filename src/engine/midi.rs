//! MIDI input.
//!
//! Decodes note messages from a MIDI input port and forwards them to the
//! audio thread through a note queue.

use anyhow::{anyhow, bail, Result};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::{info, warn};

use super::events::{NoteEvent, NoteSender};
use crate::error::SynthError;

/// An open MIDI input connection. Closing happens on drop.
pub struct MidiListener {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiListener {
    /// Connect to the first input port whose name contains `port_filter`,
    /// or the first port when no filter is given.
    pub fn connect(port_filter: Option<&str>, sender: NoteSender) -> Result<Self> {
        let mut midi_in = MidiInput::new("analogue input")?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        if ports.is_empty() {
            bail!(SynthError::NoMidiInputs);
        }

        let port = if let Some(name) = port_filter {
            ports
                .iter()
                .find(|p| {
                    midi_in
                        .port_name(p)
                        .map(|n| n.contains(name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| SynthError::MidiPortNotFound(name.to_string()))?
                .clone()
        } else {
            ports[0].clone()
        };

        let port_name = midi_in.port_name(&port)?;
        let mut sender = sender;

        let connection = midi_in
            .connect(
                &port,
                "analogue-input",
                move |_timestamp, message, _| {
                    if let Some(event) = NoteEvent::from_midi(message) {
                        if !sender.send(event) {
                            warn!(?event, "Note queue full, dropping MIDI event");
                        }
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to MIDI port '{}': {}", port_name, e))?;

        info!(port = %port_name, "MIDI input connected");

        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// List available MIDI input ports.
pub fn list_midi_inputs() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("analogue list")?;
    let ports = midi_in.ports();

    let names: Vec<String> = ports
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();

    Ok(names)
}
