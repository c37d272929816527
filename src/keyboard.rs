use std::collections::HashMap;

use crate::note::{NoteName, Pitch};

pub const DEFAULT_OCTAVE: u8 = 4;

/// Map a keyboard character to a (NoteName, octave_offset) pair.
/// The octave_offset indicates notes that spill into the next octave
/// on the keyboard layout (k, l, ;, ', o, p).
pub fn char_to_note(c: char) -> Option<(NoteName, u8)> {
    match c {
        // Home row: natural notes
        'a' => Some((NoteName::C, 0)),
        's' => Some((NoteName::D, 0)),
        'd' => Some((NoteName::E, 0)),
        'f' => Some((NoteName::F, 0)),
        'g' => Some((NoteName::G, 0)),
        'h' => Some((NoteName::A, 0)),
        'j' => Some((NoteName::B, 0)),
        'k' => Some((NoteName::C, 1)),
        'l' => Some((NoteName::D, 1)),
        ';' => Some((NoteName::E, 1)),
        '\'' => Some((NoteName::F, 1)),

        // Top row: sharps
        'w' => Some((NoteName::CSharp, 0)),
        'e' => Some((NoteName::DSharp, 0)),
        't' => Some((NoteName::FSharp, 0)),
        'y' => Some((NoteName::GSharp, 0)),
        'u' => Some((NoteName::ASharp, 0)),
        'o' => Some((NoteName::CSharp, 1)),
        'p' => Some((NoteName::DSharp, 1)),

        _ => None,
    }
}

/// Pitch played by a key with the keyboard set to `octave` (1-8).
pub fn key_pitch(c: char, octave: u8) -> Option<Pitch> {
    let (note, offset) = char_to_note(c)?;
    let octave = octave.clamp(1, 8) + offset;
    Pitch::new((octave as i64 + 1) * 12 + note.semitone() as i64).ok()
}

/// Notes started by computer keys that have not been released yet.
///
/// Each press gets a new generation, so a release timer started by an
/// earlier press of the same key is recognised as stale and ignored.
#[derive(Debug, Default)]
pub struct KeyHolds {
    held: HashMap<char, (Pitch, u64)>,
    next_generation: u64,
}

impl KeyHolds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press and return its generation.
    pub fn press(&mut self, key: char, pitch: Pitch) -> u64 {
        self.next_generation += 1;
        self.held.insert(key, (pitch, self.next_generation));
        self.next_generation
    }

    /// A real key release. Returns the pitch the key started.
    pub fn release(&mut self, key: char) -> Option<Pitch> {
        self.held.remove(&key).map(|(pitch, _)| pitch)
    }

    /// A hold timer ran out. Only releases if no newer press replaced it.
    pub fn expire(&mut self, key: char, generation: u64) -> Option<Pitch> {
        match self.held.get(&key) {
            Some(&(pitch, current)) if current == generation => {
                self.held.remove(&key);
                Some(pitch)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_mapping() {
        assert_eq!(char_to_note('a'), Some((NoteName::C, 0)));
        assert_eq!(char_to_note('w'), Some((NoteName::CSharp, 0)));
        assert_eq!(char_to_note('k'), Some((NoteName::C, 1)));
        assert_eq!(char_to_note('z'), None);
    }

    #[test]
    fn test_key_pitch() {
        assert_eq!(key_pitch('a', 4).map(Pitch::number), Some(60));
        assert_eq!(key_pitch('h', 4).map(Pitch::number), Some(69));
        assert_eq!(key_pitch('o', 4).map(Pitch::number), Some(73));
        assert_eq!(key_pitch('a', 0).map(Pitch::number), Some(24));
        assert_eq!(key_pitch('\'', 8).map(Pitch::number), Some(125));
        assert_eq!(key_pitch(' ', 4), None);
    }

    #[test]
    fn test_home_row_c_major() {
        let names: Vec<String> = ['a', 'd', 'g']
            .iter()
            .filter_map(|&c| key_pitch(c, DEFAULT_OCTAVE))
            .map(|p| p.to_string())
            .collect();
        assert_eq!(names, vec!["C4", "E4", "G4"]);
    }

    #[test]
    fn test_release_returns_pressed_pitch() {
        let mut holds = KeyHolds::new();
        let c4 = key_pitch('a', 4).unwrap();
        holds.press('a', c4);
        assert_eq!(holds.release('a'), Some(c4));
        assert_eq!(holds.release('a'), None);
    }

    #[test]
    fn test_stale_timer_does_not_release_repressed_key() {
        let mut holds = KeyHolds::new();
        let c4 = key_pitch('a', 4).unwrap();
        let first = holds.press('a', c4);
        let second = holds.press('a', c4);
        assert_eq!(holds.expire('a', first), None);
        assert_eq!(holds.expire('a', second), Some(c4));
        assert_eq!(holds.expire('a', second), None);
    }

    #[test]
    fn test_timer_after_real_release_is_ignored() {
        let mut holds = KeyHolds::new();
        let e4 = key_pitch('d', 4).unwrap();
        let generation = holds.press('d', e4);
        assert_eq!(holds.release('d'), Some(e4));
        assert_eq!(holds.expire('d', generation), None);
    }
}
