use rand::Rng;

use crate::chord::CHORD_PATTERNS;

/// What a recognised chord meant for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target was played; `next` is the newly drawn target.
    Success { next: &'static str },
    /// Some other chord was played.
    Mismatch { played: &'static str },
}

/// Owns the target chord and decides what each recognised chord means.
pub struct Session<R: Rng> {
    rng: R,
    target: &'static str,
    rounds: u32,
    wins: u32,
}

impl<R: Rng> Session<R> {
    /// Start a session with a freshly drawn target.
    pub fn new(rng: R) -> Self {
        let mut session = Self {
            rng,
            target: CHORD_PATTERNS[0].label,
            rounds: 0,
            wins: 0,
        };
        session.new_target();
        session
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Number of targets drawn so far, including the first.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Draw a target uniformly from the dictionary. Repeats are allowed.
    pub fn new_target(&mut self) -> &'static str {
        let index = self.rng.gen_range(0..CHORD_PATTERNS.len());
        self.target = CHORD_PATTERNS[index].label;
        self.rounds += 1;
        log::info!("new target: {}", self.target);
        self.target
    }

    pub fn handle_match(&mut self, reported: Option<&'static str>) -> Option<Outcome> {
        let played = reported?;
        if played == self.target {
            self.wins += 1;
            log::info!("matched target {} ({} so far)", played, self.wins);
            Some(Outcome::Success {
                next: self.new_target(),
            })
        } else {
            log::debug!("played {} while target is {}", played, self.target);
            Some(Outcome::Mismatch { played })
        }
    }
}
