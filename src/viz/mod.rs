//! Terminal spectrum display
//!
//! Provides a TUI showing:
//! - Spectrum analyzer bars
//! - Current patch settings
//! - Computer-keyboard note input and patch controls

mod spectrum;

pub use spectrum::Spectrum;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing::warn;

use crate::analyzer::SpectrumReader;
use crate::engine::{NoteEvent, NoteSender};
use crate::synth::{SharedParams, SynthParams, MAX_UNISON_VOICES};

/// Terminals report key presses but not releases
const NOTE_HOLD: Duration = Duration::from_millis(400);

/// Keyboard velocity
const KEY_VELOCITY: f32 = 0.8;

/// Piano layout on the home row, semitone offsets from the octave's C
const NOTE_KEYS: [(char, u8); 13] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
];

/// MIDI note for a piano key in `octave` (octave 4 puts 'a' on middle C)
pub fn key_to_note(key: char, octave: i32) -> Option<u8> {
    let offset = NOTE_KEYS
        .iter()
        .find(|(k, _)| *k == key.to_ascii_lowercase())
        .map(|(_, o)| *o as i32)?;
    let note = (octave + 1) * 12 + offset;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

/// What the display loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

/// Keyboard state: patch edits go to the shared parameters, notes go to
/// the audio thread
pub struct Controls {
    params: Arc<SharedParams>,
    initial: SynthParams,
    notes: NoteSender,
    octave: i32,
    held: Vec<(u8, Instant)>,
    paused: bool,
}

impl Controls {
    pub fn new(params: Arc<SharedParams>, notes: NoteSender) -> Self {
        Self {
            initial: params.snapshot(),
            params,
            notes,
            octave: 4,
            held: Vec::new(),
            paused: false,
        }
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Display frozen
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn patch(&self) -> SynthParams {
        self.params.snapshot()
    }

    /// Notes started from the keyboard and not yet released
    pub fn held_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.held.iter().map(|(note, _)| *note)
    }

    fn send(&mut self, event: NoteEvent) {
        if !self.notes.send(event) {
            warn!(?event, "Note queue full, dropping key");
        }
    }

    /// Apply one key press
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers, now: Instant) -> KeyAction {
        let patch = self.params.snapshot();

        match code {
            KeyCode::Esc | KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return KeyAction::Quit
            }
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('z') => self.octave = (self.octave - 1).max(0),
            KeyCode::Char('x') => self.octave = (self.octave + 1).min(8),
            KeyCode::Char('r') => self.params.store(&self.initial),
            KeyCode::Char('n') => self.params.set_noise(!patch.noise_enabled, patch.noise_level),
            KeyCode::Char('m') => self.params.set_waveform(patch.waveform.next()),
            KeyCode::Char(']') => self.params.set_unison_voices(patch.unison_voices + 1),
            KeyCode::Char('[') => self.params.set_unison_voices(patch.unison_voices - 1),
            KeyCode::Up => self.params.set_cutoff(patch.cutoff * 1.12),
            KeyCode::Down => self.params.set_cutoff(patch.cutoff / 1.12),
            KeyCode::Right => self.params.set_resonance(patch.resonance + 0.25),
            KeyCode::Left => self.params.set_resonance(patch.resonance - 0.25),
            KeyCode::Char(c) => {
                if let Some(note) = key_to_note(c, self.octave) {
                    self.press(note, now);
                }
            }
            _ => {}
        }

        KeyAction::Continue
    }

    fn press(&mut self, note: u8, now: Instant) {
        // Key repeat extends a held note instead of retriggering it
        if let Some(entry) = self.held.iter_mut().find(|(n, _)| *n == note) {
            entry.1 = now;
            return;
        }
        self.send(NoteEvent::NoteOn {
            note,
            velocity: KEY_VELOCITY,
        });
        self.held.push((note, now));
    }

    /// Release keyboard notes held longer than the hold time
    pub fn release_expired(&mut self, now: Instant) {
        let mut i = 0;
        while i < self.held.len() {
            let (note, pressed) = self.held[i];
            if now.duration_since(pressed) >= NOTE_HOLD {
                self.send(NoteEvent::NoteOff { note });
                self.held.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Release everything still held
    pub fn release_all(&mut self) {
        self.held.clear();
        self.send(NoteEvent::AllNotesOff);
    }
}

/// Run the spectrum TUI until the user quits or `running` is cleared
pub fn run_viz(
    mut reader: SpectrumReader,
    mut controls: Controls,
    running: Arc<AtomicBool>,
    refresh_hz: u32,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let frame_time = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);
    let result = (|| -> Result<()> {
        while running.load(Ordering::SeqCst) {
            let frame_start = Instant::now();

            if !controls.paused() {
                // A missed frame keeps showing the previous one
                let _ = reader.consume_if_ready();
            }

            terminal.draw(|f| draw_ui(f, reader.last_frame(), &controls))?;

            // Handle input for the rest of the frame
            let remaining = frame_time.saturating_sub(frame_start.elapsed());
            if event::poll(remaining)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Release
                        && controls.handle_key(key.code, key.modifiers, Instant::now())
                            == KeyAction::Quit
                    {
                        running.store(false, Ordering::SeqCst);
                    }
                }
            }
            controls.release_expired(Instant::now());
        }
        Ok(())
    })();

    controls.release_all();

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn draw_ui(f: &mut Frame, bins: &[f32], controls: &Controls) {
    let area = f.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    // Layout: spectrum on top, status at bottom
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Spectrum
            Constraint::Length(4), // Status
        ])
        .split(area);

    let title = if controls.paused() {
        " Spectrum (paused) "
    } else {
        " Spectrum "
    };
    let spectrum = Spectrum::new(bins)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(spectrum, chunks[0]);

    draw_status(f, chunks[1], controls);
}

fn draw_status(f: &mut Frame, area: Rect, controls: &Controls) {
    let patch = controls.patch();
    let noise = if patch.noise_enabled { "on" } else { "off" };

    let settings = Line::from(vec![
        Span::styled(
            format!("  {:<8}", patch.waveform.name()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!(
            "unison {}/{}  cutoff {:>5.0} Hz  res {:.2}  noise {}  octave {}",
            patch.unison_voices,
            MAX_UNISON_VOICES,
            patch.cutoff,
            patch.resonance,
            noise,
            controls.octave()
        )),
    ]);
    let help = Line::from(Span::styled(
        "  a-k: play  z/x: octave  m: wave  [ ]: unison  arrows: cutoff/res  n: noise  r: reset  space: freeze  q: quit",
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(vec![settings, help]).block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}
