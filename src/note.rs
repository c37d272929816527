use std::fmt;

use thiserror::Error;

/// Musical note names (chromatic scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    /// All twelve pitch classes in semitone order, starting at C.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// MIDI note number within an octave (C=0, B=11)
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn from_semitone(semitone: u8) -> NoteName {
        Self::ALL[(semitone % 12) as usize]
    }

    /// Sharp-spelled name as shown on screen ("C#", not "Db").
    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }

    pub fn from_str_name(name: &str) -> Option<NoteName> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("pitch {0} is outside the MIDI range 0-127")]
    OutOfRange(i64),
    #[error("malformed pitch name: {0:?}")]
    Malformed(String),
}

/// A MIDI pitch identifier, guaranteed to lie in 0..=127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch(u8);

impl Pitch {
    pub const MAX: u8 = 127;

    pub fn new(number: i64) -> Result<Pitch, PitchError> {
        if (0..=Self::MAX as i64).contains(&number) {
            Ok(Pitch(number as u8))
        } else {
            Err(PitchError::OutOfRange(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn class(self) -> NoteName {
        NoteName::from_semitone(self.0)
    }

    /// Octave in scientific pitch notation; MIDI 0 is octave -1.
    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Frequency in Hz (A4 = 440 Hz)
    pub fn to_freq(self) -> f64 {
        440.0 * 2.0_f64.powf((self.0 as f64 - 69.0) / 12.0)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class(), self.octave())
    }
}

/// Name a pitch as `<class><octave>`, e.g. 60 -> "C4", 0 -> "C-1".
pub fn name_of(pitch: Pitch) -> String {
    pitch.to_string()
}

/// Drop the signed octave suffix from a pitch name: "C#4" -> "C#", "C-1" -> "C".
///
/// Names without a numeric suffix are returned unchanged.
pub fn strip_octave(name: &str) -> &str {
    let class = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if class.len() == name.len() {
        return name;
    }
    class.strip_suffix('-').unwrap_or(class)
}

/// Parse a name such as "G#5" or "C-1" back into a pitch.
pub fn parse_pitch_name(name: &str) -> Result<Pitch, PitchError> {
    let malformed = || PitchError::Malformed(name.to_string());

    let class = strip_octave(name);
    let note = NoteName::from_str_name(class).ok_or_else(malformed)?;
    let octave: i64 = name[class.len()..].parse().map_err(|_| malformed())?;

    Pitch::new((octave + 1) * 12 + note.semitone() as i64)
}
