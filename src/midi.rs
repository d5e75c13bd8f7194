use nih_plug::prelude::*;

use crate::sampler::{NoteMessage, TimedEvent};

/// MIDI CC 120: All Sound Off.
pub const CC_ALL_SOUND_OFF: u8 = 120;
/// MIDI CC 123: All Notes Off.
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Translate a host note event into a sampler event.
///
/// A note-on with zero velocity is a note-off. CC 120 and 123 both become a
/// hard stop of every voice. Everything else is ignored.
pub fn translate_event(event: &NoteEvent<()>) -> Option<TimedEvent> {
    let message = match *event {
        NoteEvent::NoteOn { note, velocity, .. } if velocity > 0.0 => NoteMessage::NoteOn {
            note,
            velocity: velocity_to_float(velocity),
        },
        NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => {
            NoteMessage::NoteOff { note }
        }
        NoteEvent::MidiCC { cc, .. } if cc == CC_ALL_SOUND_OFF || cc == CC_ALL_NOTES_OFF => {
            NoteMessage::AllNotesOff
        }
        _ => return None,
    };
    Some(TimedEvent::new(event.timing(), message))
}

/// Clamp a normalized host velocity into 0.0–1.0.
#[inline]
pub fn velocity_to_float(velocity: f32) -> f32 {
    velocity.clamp(0.0, 1.0)
}
