//! Typed failures of the outer layers
//!
//! The render path has no error type; everything there is clamped. These
//! are the failures of setup work (config, devices, MIDI) that callers may
//! want to match on after they come back through `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Output device '{0}' not found")]
    OutputDeviceNotFound(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("No MIDI input ports available")]
    NoMidiInputs,

    #[error("MIDI port '{0}' not found")]
    MidiPortNotFound(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            SynthError::MidiPortNotFound("Keystep".into()).to_string(),
            "MIDI port 'Keystep' not found"
        );
        assert_eq!(
            SynthError::InvalidConfig("master.volume must be between 0 and 1".into()).to_string(),
            "Invalid config: master.volume must be between 0 and 1"
        );
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = SynthError::NoOutputDevice.into();
        assert!(matches!(
            err.downcast_ref::<SynthError>(),
            Some(SynthError::NoOutputDevice)
        ));
    }
}
