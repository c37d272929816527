use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use rand::Rng;

use crate::chord::pattern_of;
use crate::engine::NoteEvent;
use crate::keyboard::{DEFAULT_OCTAVE, KeyHolds, key_pitch};
use crate::listener::ListenerMessage;
use crate::session::{Outcome, Session};
use crate::synth::HintPlayer;

const KEY_VELOCITY: u8 = 100;

/// Background indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Normal,
    Mismatch,
}

impl Feedback {
    fn background(self) -> Color {
        match self {
            Feedback::Normal => Color::Black,
            Feedback::Mismatch => Color::DarkRed,
        }
    }
}

/// Where notes come from, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Midi(String),
    Keyboard { hold_ms: u64 },
}

/// What the screen shows. Only the display loop touches it.
struct Screen {
    target: &'static str,
    feedback: Feedback,
    last_played: Option<&'static str>,
    wins: u32,
    octave: u8,
    notice: Option<String>,
}

impl Screen {
    fn set_target(&mut self, target: &'static str) {
        self.target = target;
    }

    fn set_feedback(&mut self, feedback: Feedback) {
        self.feedback = feedback;
    }
}

/// Run the game until Esc is pressed.
///
/// `keyboard` is the note channel for computer-keyboard input; pass `None`
/// when notes come from a MIDI device instead.
pub fn run<R: Rng>(
    session: &mut Session<R>,
    messages: Receiver<ListenerMessage>,
    keyboard: Option<Sender<NoteEvent>>,
    source: InputSource,
    hint: Option<HintPlayer>,
    notice: Option<String>,
) -> Result<(), String> {
    let mut stdout = io::stdout();

    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    execute!(stdout, EnterAlternateScreen, cursor::Hide)
        .map_err(|e| format!("alternate screen: {}", e))?;

    // Key release reporting is needed to hold keyboard chords. Only trust it
    // when the terminal answers the keyboard enhancement query; macOS terminals
    // may claim support without sending releases, so use the timer there.
    let has_key_release = reports_key_release(terminal::supports_keyboard_enhancement())
        && queue!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok()
        && stdout.flush().is_ok();
    log::debug!("key release reporting: {}", has_key_release);

    let mut screen = Screen {
        target: session.target(),
        feedback: Feedback::Normal,
        last_played: None,
        wins: session.wins(),
        octave: DEFAULT_OCTAVE,
        notice,
    };

    let result = event_loop(
        session,
        &mut screen,
        &mut stdout,
        &messages,
        keyboard.as_ref(),
        &source,
        hint.as_ref(),
        has_key_release,
    );

    if let Some(hint) = &hint {
        hint.stop();
    }

    // Restore terminal
    if has_key_release {
        let _ = execute!(
            stdout,
            crossterm::event::PopKeyboardEnhancementFlags,
            cursor::Show,
            LeaveAlternateScreen
        );
    } else {
        let _ = execute!(stdout, cursor::Show, LeaveAlternateScreen);
    }
    let _ = terminal::disable_raw_mode();

    result
}

fn reports_key_release(query: io::Result<bool>) -> bool {
    !cfg!(target_os = "macos") && matches!(query, Ok(true))
}

#[allow(clippy::too_many_arguments)]
fn event_loop<R: Rng>(
    session: &mut Session<R>,
    screen: &mut Screen,
    stdout: &mut io::Stdout,
    messages: &Receiver<ListenerMessage>,
    keyboard: Option<&Sender<NoteEvent>>,
    source: &InputSource,
    hint: Option<&HintPlayer>,
    has_key_release: bool,
) -> Result<(), String> {
    // Pitch each held key started, so a release after an octave change
    // still releases the right note
    let mut holds = KeyHolds::new();

    // For the fallback path: hold timers report (key, generation) here so
    // the loop can drop releases made stale by a newer press of the key.
    let (fallback_tx, fallback_rx) = mpsc::channel::<(char, u64)>();

    render(stdout, screen, source)?;

    loop {
        let mut dirty = false;

        if let Some(keyboard) = keyboard {
            while let Ok((key, generation)) = fallback_rx.try_recv() {
                if let Some(pitch) = holds.expire(key, generation) {
                    keyboard
                        .send(NoteEvent::off(pitch))
                        .map_err(|_| "chord listener stopped".to_string())?;
                }
            }
        }

        // Apply everything the listener reported since the last tick
        while let Ok(message) = messages.try_recv() {
            dirty = true;
            match message {
                ListenerMessage::Matched(played) => {
                    screen.last_played = Some(played);
                    match session.handle_match(Some(played)) {
                        Some(Outcome::Success { next }) => {
                            screen.set_feedback(Feedback::Normal);
                            screen.set_target(next);
                            screen.wins = session.wins();
                        }
                        Some(Outcome::Mismatch { .. }) => {
                            screen.set_feedback(Feedback::Mismatch);
                        }
                        None => {}
                    }
                }
                ListenerMessage::InputLost(reason) => {
                    log::error!("input lost: {}", reason);
                    screen.notice = Some(format!("input lost: {}", reason));
                }
            }
        }

        if dirty {
            render(stdout, screen, source)?;
        }

        if !event::poll(Duration::from_millis(50))
            .map_err(|e| format!("event poll error: {}", e))?
        {
            continue;
        }

        let ev = event::read().map_err(|e| format!("event read error: {}", e))?;

        match ev {
            Event::Key(KeyEvent {
                code: KeyCode::Esc,
                kind: KeyEventKind::Press,
                ..
            }) => {
                return Ok(());
            }

            Event::Key(KeyEvent {
                code: KeyCode::Char(' '),
                kind: KeyEventKind::Press,
                ..
            }) => {
                if let (Some(hint), Some(pattern)) = (hint, pattern_of(screen.target)) {
                    if let Err(e) = hint.play(pattern) {
                        log::warn!("hint failed: {}", e);
                    }
                }
            }

            Event::Key(KeyEvent {
                code: KeyCode::Char(c),
                kind: KeyEventKind::Press,
                ..
            }) => {
                let Some(keyboard) = keyboard else {
                    continue;
                };

                // Octave change with number keys
                if let Some(digit) = c.to_digit(10) {
                    if (1..=8).contains(&digit) {
                        screen.octave = digit as u8;
                        render(stdout, screen, source)?;
                        continue;
                    }
                }

                if let Some(pitch) = key_pitch(c, screen.octave) {
                    // Re-pressing a key after an octave change moves its note
                    if let Some(previous) = holds.release(c) {
                        if previous != pitch {
                            keyboard
                                .send(NoteEvent::off(previous))
                                .map_err(|_| "chord listener stopped".to_string())?;
                        }
                    }
                    let generation = holds.press(c, pitch);
                    keyboard
                        .send(NoteEvent::on(pitch, KEY_VELOCITY))
                        .map_err(|_| "chord listener stopped".to_string())?;

                    // Fallback: no key release support, release after the hold window
                    if !has_key_release {
                        if let InputSource::Keyboard { hold_ms } = source {
                            let tx = fallback_tx.clone();
                            let hold = Duration::from_millis(*hold_ms);
                            std::thread::spawn(move || {
                                std::thread::sleep(hold);
                                let _ = tx.send((c, generation));
                            });
                        }
                    }
                }
            }

            Event::Key(KeyEvent {
                code: KeyCode::Char(c),
                kind: KeyEventKind::Release,
                ..
            }) => {
                if let (Some(keyboard), Some(pitch)) = (keyboard, holds.release(c)) {
                    keyboard
                        .send(NoteEvent::off(pitch))
                        .map_err(|_| "chord listener stopped".to_string())?;
                }
            }

            Event::Resize(..) => render(stdout, screen, source)?,

            _ => {}
        }
    }
}

fn render(stdout: &mut io::Stdout, screen: &Screen, source: &InputSource) -> Result<(), String> {
    let (cols, rows) = terminal::size().map_err(|e| format!("terminal size: {}", e))?;
    let centre = |text: &str| cols.saturating_sub(text.chars().count() as u16) / 2;

    let target = format!("  {}  ", screen.target);
    let source_text = match source {
        InputSource::Midi(name) => format!("MIDI: {}", name),
        InputSource::Keyboard { .. } => format!("Keyboard (octave {})", screen.octave),
    };
    let played = screen.last_played.unwrap_or("---");
    let status = format!(
        "{}  |  Played: {}  |  Correct: {}",
        source_text, played, screen.wins
    );
    let help = if matches!(source, InputSource::Keyboard { .. }) {
        "a w s e d f t g y h u j k o l p ; '  notes   1-8 octave   Space hint   Esc quit"
    } else {
        "Space hint   Esc quit"
    };

    let middle = rows / 2;
    queue!(
        stdout,
        SetBackgroundColor(screen.feedback.background()),
        SetForegroundColor(Color::White),
        Clear(ClearType::All),
        cursor::MoveTo(centre("Play this chord"), middle.saturating_sub(3)),
        Print("Play this chord"),
        cursor::MoveTo(centre(&target), middle.saturating_sub(1)),
        SetAttribute(Attribute::Bold),
        SetAttribute(Attribute::Reverse),
        Print(&target),
        SetAttribute(Attribute::Reset),
        SetBackgroundColor(screen.feedback.background()),
        SetForegroundColor(Color::White),
        cursor::MoveTo(centre(&status), middle + 2),
        Print(&status),
        cursor::MoveTo(centre(help), rows.saturating_sub(2)),
        Print(help),
    )
    .map_err(|e| format!("draw: {}", e))?;

    if let Some(notice) = &screen.notice {
        queue!(
            stdout,
            cursor::MoveTo(centre(notice), middle + 4),
            SetForegroundColor(Color::Yellow),
            Print(notice),
        )
        .map_err(|e| format!("draw: {}", e))?;
    }

    stdout.flush().map_err(|e| format!("draw: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_colours() {
        assert_eq!(Feedback::Normal.background(), Color::Black);
        assert_eq!(Feedback::Mismatch.background(), Color::DarkRed);
    }

    #[test]
    fn test_unconfirmed_key_release_uses_timer() {
        assert!(!reports_key_release(Ok(false)));
        assert!(!reports_key_release(Err(io::Error::other("no reply"))));
        assert_eq!(reports_key_release(Ok(true)), !cfg!(target_os = "macos"));
    }
}
