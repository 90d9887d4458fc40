//! Note events and the queue that carries them to the audio thread

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// MIDI controller: all sound off
const CC_ALL_SOUND_OFF: u8 = 120;
/// MIDI controller: all notes off
const CC_ALL_NOTES_OFF: u8 = 123;

/// A note change for the voice pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    /// Start a note. Velocity is 0.0-1.0.
    NoteOn { note: u8, velocity: f32 },
    /// Release a note
    NoteOff { note: u8 },
    /// Release every sounding note
    AllNotesOff,
}

impl NoteEvent {
    /// Decode a raw MIDI message. Channel is ignored; messages that are not
    /// note changes give `None`.
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;

        match status & 0xF0 {
            0x90 => {
                let note = *data.first()? & 0x7F;
                let velocity = *data.get(1)? & 0x7F;
                // Running-status note-offs arrive as note-on with velocity 0
                if velocity == 0 {
                    Some(NoteEvent::NoteOff { note })
                } else {
                    Some(NoteEvent::NoteOn {
                        note,
                        velocity: velocity as f32 / 127.0,
                    })
                }
            }
            0x80 => {
                let note = *data.first()? & 0x7F;
                Some(NoteEvent::NoteOff { note })
            }
            0xB0 => match data.first()? & 0x7F {
                CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF => Some(NoteEvent::AllNotesOff),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Producer half of a note queue, owned by one control thread
pub struct NoteSender {
    producer: HeapProd<NoteEvent>,
}

impl NoteSender {
    /// Queue an event. Returns false if the queue is full and it was dropped.
    pub fn send(&mut self, event: NoteEvent) -> bool {
        self.producer.try_push(event).is_ok()
    }
}

/// Consumer half of a note queue, owned by the audio thread
pub struct NoteReceiver {
    consumer: HeapCons<NoteEvent>,
}

impl NoteReceiver {
    /// Take the oldest queued event
    pub fn try_recv(&mut self) -> Option<NoteEvent> {
        self.consumer.try_pop()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

/// Create a single-producer single-consumer note queue
pub fn note_queue(capacity: usize) -> (NoteSender, NoteReceiver) {
    let (producer, consumer) = HeapRb::<NoteEvent>::new(capacity.max(1)).split();
    (NoteSender { producer }, NoteReceiver { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_decode_note_on() {
        assert_eq!(
            NoteEvent::from_midi(&[0x90, 60, 127]),
            Some(NoteEvent::NoteOn {
                note: 60,
                velocity: 1.0
            })
        );
        // Channel bits are ignored
        assert!(matches!(
            NoteEvent::from_midi(&[0x95, 72, 64]),
            Some(NoteEvent::NoteOn { note: 72, .. })
        ));
    }

    #[test]
    fn test_decode_note_off() {
        assert_eq!(
            NoteEvent::from_midi(&[0x80, 60, 40]),
            Some(NoteEvent::NoteOff { note: 60 })
        );
        assert_eq!(
            NoteEvent::from_midi(&[0x90, 60, 0]),
            Some(NoteEvent::NoteOff { note: 60 })
        );
    }

    #[test]
    fn test_decode_all_notes_off() {
        assert_eq!(
            NoteEvent::from_midi(&[0xB0, 123, 0]),
            Some(NoteEvent::AllNotesOff)
        );
        assert_eq!(
            NoteEvent::from_midi(&[0xB3, 120, 0]),
            Some(NoteEvent::AllNotesOff)
        );
        assert_eq!(NoteEvent::from_midi(&[0xB0, 1, 64]), None);
    }

    #[test]
    fn test_decode_ignores_other_messages() {
        assert_eq!(NoteEvent::from_midi(&[]), None);
        assert_eq!(NoteEvent::from_midi(&[0x90, 60]), None);
        assert_eq!(NoteEvent::from_midi(&[0xE0, 0x00, 0x40]), None);
        assert_eq!(NoteEvent::from_midi(&[0xF8]), None);
    }

    #[test]
    fn test_queue_order_and_overflow() {
        let (mut tx, mut rx) = note_queue(2);
        assert!(rx.is_empty());
        assert!(tx.send(NoteEvent::NoteOn {
            note: 60,
            velocity: 0.5
        }));
        assert!(tx.send(NoteEvent::NoteOff { note: 60 }));
        assert!(!tx.send(NoteEvent::AllNotesOff));

        assert!(matches!(rx.try_recv(), Some(NoteEvent::NoteOn { note: 60, .. })));
        assert_eq!(rx.try_recv(), Some(NoteEvent::NoteOff { note: 60 }));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_queue_across_threads() {
        let (mut tx, mut rx) = note_queue(16);
        let producer = thread::spawn(move || {
            for note in 0..100u8 {
                while !tx.send(NoteEvent::NoteOff { note }) {
                    thread::yield_now();
                }
            }
        });

        let mut expected = 0u8;
        while expected < 100 {
            match rx.try_recv() {
                Some(NoteEvent::NoteOff { note }) => {
                    assert_eq!(note, expected);
                    expected += 1;
                }
                Some(other) => panic!("unexpected {:?}", other),
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
    }
}
