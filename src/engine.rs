use std::collections::HashSet;

use crate::chord::match_chord;
use crate::note::{Pitch, name_of, parse_pitch_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    NoteOn,
    NoteOff,
}

/// A decoded note message from any input source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub kind: NoteKind,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn on(pitch: Pitch, velocity: u8) -> Self {
        Self {
            pitch,
            kind: NoteKind::NoteOn,
            velocity,
        }
    }

    pub fn off(pitch: Pitch) -> Self {
        Self {
            pitch,
            kind: NoteKind::NoteOff,
            velocity: 0,
        }
    }

    /// Note-on with velocity 0 counts as a release.
    pub fn is_press(&self) -> bool {
        self.kind == NoteKind::NoteOn && self.velocity > 0
    }
}

/// Tracks which notes are held and reports when they form a known chord.
#[derive(Debug, Default)]
pub struct ChordEngine {
    held: HashSet<String>,
}

impl ChordEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one note event, then test the held notes against the chord
    /// dictionary. A match empties the held set, including notes that were
    /// not part of the matched chord.
    pub fn on_note_event(&mut self, event: NoteEvent) -> Option<&'static str> {
        let name = name_of(event.pitch);
        if event.is_press() {
            self.held.insert(name);
        } else {
            self.held.remove(&name);
        }

        let chord = match_chord(self.held.iter().map(String::as_str));
        if chord.is_some() {
            self.held.clear();
        }
        chord
    }

    /// Held note names, lowest pitch first.
    pub fn held_notes(&self) -> Vec<&str> {
        let mut notes: Vec<&str> = self.held.iter().map(String::as_str).collect();
        notes.sort_by_key(|n| parse_pitch_name(n).map(Pitch::number).unwrap_or(0));
        notes
    }
}
