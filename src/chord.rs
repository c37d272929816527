use std::collections::HashSet;

use crate::note::strip_octave;

/// A named triad: its label and three reference pitches in a default voicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordPattern {
    pub label: &'static str,
    pub notes: [&'static str; 3],
}

const fn triad(label: &'static str, notes: [&'static str; 3]) -> ChordPattern {
    ChordPattern { label, notes }
}

/// Every recognised chord, in match order. The first pattern contained in the
/// held notes wins, so this order is the tie-break.
pub static CHORD_PATTERNS: [ChordPattern; 24] = [
    triad("C", ["C4", "E4", "G4"]),
    triad("C#", ["C#4", "F4", "G#4"]),
    triad("D", ["D4", "F#4", "A4"]),
    triad("D#", ["D#4", "G4", "A#4"]),
    triad("E", ["E4", "G#4", "B4"]),
    triad("F", ["F4", "A4", "C5"]),
    triad("F#", ["F#4", "A#4", "C#5"]),
    triad("G", ["G4", "B4", "D5"]),
    triad("G#", ["G#4", "C5", "D#5"]),
    triad("A", ["A4", "C#5", "E5"]),
    triad("A#", ["A#4", "D5", "F5"]),
    triad("B", ["B4", "D#5", "F#5"]),
    triad("Cm", ["C4", "D#4", "G4"]),
    triad("C#m", ["C#4", "E4", "G#4"]),
    triad("Dm", ["D4", "F4", "A4"]),
    triad("D#m", ["D#4", "F#4", "A#4"]),
    triad("Em", ["E4", "G4", "B4"]),
    triad("Fm", ["F4", "G#4", "C5"]),
    triad("F#m", ["F#4", "A4", "C#5"]),
    triad("Gm", ["G4", "A#4", "D5"]),
    triad("G#m", ["G#4", "B4", "D#5"]),
    triad("Am", ["A4", "C5", "E5"]),
    triad("A#m", ["A#4", "C#5", "F5"]),
    triad("Bm", ["B4", "D5", "F#5"]),
];

impl ChordPattern {
    pub fn pitch_classes(&self) -> [&'static str; 3] {
        self.notes.map(strip_octave)
    }
}

pub fn pattern_of(label: &str) -> Option<&'static ChordPattern> {
    CHORD_PATTERNS.iter().find(|p| p.label == label)
}

/// Find the first chord whose pitch classes are all present among `held`,
/// ignoring octaves. Extra held notes do not prevent a match.
pub fn match_chord<'a, I>(held: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let classes: HashSet<&str> = held.into_iter().map(strip_octave).collect();
    if classes.len() < 3 {
        return None;
    }

    CHORD_PATTERNS
        .iter()
        .find(|p| p.pitch_classes().iter().all(|c| classes.contains(c)))
        .map(|p| p.label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{NoteName, parse_pitch_name};

    #[test]
    fn test_dictionary_shape() {
        assert_eq!(CHORD_PATTERNS.len(), 24);
        for (i, note) in NoteName::ALL.iter().enumerate() {
            assert_eq!(CHORD_PATTERNS[i].label, note.as_str());
            assert_eq!(CHORD_PATTERNS[i + 12].label, format!("{}m", note));
        }
        for pattern in &CHORD_PATTERNS {
            let classes: HashSet<_> = pattern.pitch_classes().into_iter().collect();
            assert_eq!(classes.len(), 3, "{} has duplicate classes", pattern.label);
        }
    }

    #[test]
    fn test_patterns_are_root_position_triads() {
        for (i, pattern) in CHORD_PATTERNS.iter().enumerate() {
            let third = if i < 12 { 4 } else { 3 };
            let pitches: Vec<u8> = pattern
                .notes
                .iter()
                .map(|n| parse_pitch_name(n).unwrap().number())
                .collect();
            assert_eq!(pitches[1] - pitches[0], third, "{}", pattern.label);
            assert_eq!(pitches[2] - pitches[0], 7, "{}", pattern.label);
        }
    }

    #[test]
    fn test_match_ignores_octave() {
        assert_eq!(match_chord(["C2", "E6", "G-1"]), Some("C"));
        assert_eq!(match_chord(["C#4", "F4", "G#4"]), Some("C#"));
        assert_eq!(match_chord(["A3", "C4", "E4"]), Some("Am"));
    }

    #[test]
    fn test_extra_notes_still_match() {
        assert_eq!(match_chord(["C4", "E4", "G4", "F4"]), Some("C"));
    }

    #[test]
    fn test_first_pattern_wins() {
        // C E G B holds both C major and E minor; C comes first.
        assert_eq!(match_chord(["C4", "E4", "G4", "B4"]), Some("C"));
        // A C E G holds Am and C; C is earlier in the dictionary.
        assert_eq!(match_chord(["A3", "C4", "E4", "G4"]), Some("C"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(match_chord(Vec::<&str>::new()), None);
        assert_eq!(match_chord(["C4", "E4"]), None);
        assert_eq!(match_chord(["C4", "C5", "C6"]), None);
        assert_eq!(match_chord(["C4", "D4", "E4"]), None);
    }

    #[test]
    fn test_every_pattern_matches_itself() {
        for pattern in &CHORD_PATTERNS {
            assert_eq!(match_chord(pattern.notes), Some(pattern.label));
            assert_eq!(pattern_of(pattern.label), Some(pattern));
        }
    }

    #[test]
    fn test_match_is_idempotent() {
        let held = ["D4", "F#4", "A4", "C5"];
        assert_eq!(match_chord(held), match_chord(held));
    }

    #[test]
    fn test_any_voicing_with_extra_note_matches() {
        for pattern in &CHORD_PATTERNS {
            let classes = pattern.pitch_classes();
            let extra = NoteName::ALL
                .iter()
                .map(|n| n.as_str())
                .find(|n| !classes.contains(n))
                .unwrap();

            for base in [-1, 2, 5, 9] {
                let mut held: Vec<String> = classes
                    .iter()
                    .enumerate()
                    .map(|(i, class)| format!("{}{}", class, (base + i as i32).min(9)))
                    .collect();
                held.push(format!("{}{}", extra, base));

                let found = match_chord(held.iter().map(String::as_str))
                    .unwrap_or_else(|| panic!("{} not found in {:?}", pattern.label, held));
                let held_classes: HashSet<&str> =
                    held.iter().map(|n| strip_octave(n)).collect();
                for class in pattern_of(found).unwrap().pitch_classes() {
                    assert!(held_classes.contains(&class), "{} -> {}", pattern.label, found);
                }
            }
        }
    }
}
