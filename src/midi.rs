use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use midly::MidiMessage;
use midly::live::LiveEvent;
use thiserror::Error;

use crate::engine::NoteEvent;
use crate::listener::ListenerMessage;
use crate::note::{Pitch, PitchError};

const CLIENT_NAME: &str = "chordtrainer";

/// How often the connected port is checked for removal
pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum MidiInputError {
    #[error("failed to initialize midi: {0}")]
    Init(String),
    #[error("No MIDI devices found!")]
    NoDevice,
    #[error("no midi input matches {0:?}")]
    UnknownPort(String),
    #[error("failed to create midi connection: {0}")]
    Connect(String),
    #[error("malformed midi message {bytes:02x?}: {reason}")]
    Malformed { bytes: Vec<u8>, reason: String },
    #[error(transparent)]
    Pitch(#[from] PitchError),
}

/// An open input port. Dropping it closes the connection.
pub struct MidiSource {
    pub port_name: String,
    _connection: MidiInputConnection<()>,
}

fn open_input() -> Result<MidiInput, MidiInputError> {
    let mut input = MidiInput::new(CLIENT_NAME).map_err(|e| MidiInputError::Init(e.to_string()))?;
    input.ignore(Ignore::All);
    Ok(input)
}

/// Names of the available input ports, in index order.
pub fn list_ports() -> Result<Vec<String>, MidiInputError> {
    let input = open_input()?;
    Ok(input
        .ports()
        .iter()
        .map(|port| {
            input
                .port_name(port)
                .unwrap_or_else(|_| "Unknown".to_string())
        })
        .collect())
}

/// Pick a port by index or by case-insensitive name substring; the first
/// port when no selector is given. A selector that matches nothing is an
/// error even when there are no ports at all.
fn pick_port(names: &[String], selector: Option<&str>) -> Result<usize, MidiInputError> {
    let Some(selector) = selector else {
        return if names.is_empty() {
            Err(MidiInputError::NoDevice)
        } else {
            Ok(0)
        };
    };

    match selector.parse::<usize>() {
        Ok(index) if index < names.len() => Ok(index),
        _ => {
            let needle = selector.to_lowercase();
            names
                .iter()
                .position(|name| name.to_lowercase().contains(&needle))
                .ok_or_else(|| MidiInputError::UnknownPort(selector.to_string()))
        }
    }
}

fn select_port(
    input: &MidiInput,
    selector: Option<&str>,
) -> Result<(MidiInputPort, String), MidiInputError> {
    let ports = input.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|port| {
            input
                .port_name(port)
                .unwrap_or_else(|_| "Unknown".to_string())
        })
        .collect();

    let index = pick_port(&names, selector)?;
    let port = ports
        .into_iter()
        .nth(index)
        .ok_or(MidiInputError::NoDevice)?;
    Ok((port, names[index].clone()))
}

/// Connect to an input port and forward its note messages to `events`.
/// Everything else the device sends is dropped.
pub fn connect(
    selector: Option<&str>,
    events: Sender<NoteEvent>,
) -> Result<MidiSource, MidiInputError> {
    let input = open_input()?;
    let (port, port_name) = select_port(&input, selector)?;
    log::info!("connecting to midi input {:?}", port_name);

    let mut skipped = 0usize;
    let connection = input
        .connect(
            &port,
            "chordtrainer-in",
            move |_, message, _| match decode(message) {
                Ok(Some(event)) => {
                    if events.send(event).is_err() {
                        log::debug!("listener gone, dropping {:?}", event);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    log::warn!("skipping midi message ({} skipped): {}", skipped, e);
                }
            },
            (),
        )
        .map_err(|e| MidiInputError::Connect(e.to_string()))?;

    Ok(MidiSource {
        port_name,
        _connection: connection,
    })
}

/// Report `InputLost` once `port_name` stops appearing in `list`. midir gives
/// no disconnect callback, so the port list is polled every `interval`. A
/// failed listing counts as a loss. The thread exits after reporting.
pub fn watch_port<F>(
    port_name: String,
    mut list: F,
    out: Sender<ListenerMessage>,
    interval: Duration,
) -> Result<JoinHandle<()>, String>
where
    F: FnMut() -> Result<Vec<String>, MidiInputError> + Send + 'static,
{
    thread::Builder::new()
        .name("midi-watch".into())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                let present = match list() {
                    Ok(names) => names.iter().any(|name| *name == port_name),
                    Err(e) => {
                        log::warn!("cannot list midi inputs: {}", e);
                        false
                    }
                };
                if !present {
                    log::error!("midi input {:?} disappeared", port_name);
                    let _ = out.send(ListenerMessage::InputLost(format!(
                        "MIDI device {} disconnected",
                        port_name
                    )));
                    return;
                }
            }
        })
        .map_err(|e| format!("failed to spawn midi watcher: {}", e))
}

/// Decode one raw message. `Ok(None)` for well-formed messages that are not
/// note-on/note-off.
pub fn decode(bytes: &[u8]) -> Result<Option<NoteEvent>, MidiInputError> {
    let event = LiveEvent::parse(bytes).map_err(|e| MidiInputError::Malformed {
        bytes: bytes.to_vec(),
        reason: e.to_string(),
    })?;

    let LiveEvent::Midi { message, .. } = event else {
        return Ok(None);
    };

    let note = match message {
        MidiMessage::NoteOn { key, vel } => NoteEvent::on(Pitch::new(key.as_int() as i64)?, vel.as_int()),
        MidiMessage::NoteOff { key, .. } => NoteEvent::off(Pitch::new(key.as_int() as i64)?),
        _ => return Ok(None),
    };
    Ok(Some(note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoteKind;

    #[test]
    fn test_decode_note_on() {
        let event = decode(&[0x90, 60, 100]).unwrap().unwrap();
        assert_eq!(event.pitch.number(), 60);
        assert_eq!(event.kind, NoteKind::NoteOn);
        assert_eq!(event.velocity, 100);
        assert!(event.is_press());
    }

    #[test]
    fn test_decode_note_on_other_channel() {
        let event = decode(&[0x93, 69, 20]).unwrap().unwrap();
        assert_eq!(event.pitch.number(), 69);
    }

    #[test]
    fn test_decode_zero_velocity_is_release() {
        let event = decode(&[0x90, 60, 0]).unwrap().unwrap();
        assert_eq!(event.kind, NoteKind::NoteOn);
        assert!(!event.is_press());
    }

    #[test]
    fn test_decode_note_off() {
        let event = decode(&[0x80, 64, 40]).unwrap().unwrap();
        assert_eq!(event, NoteEvent::off(Pitch::new(64).unwrap()));
    }

    #[test]
    fn test_decode_ignores_other_messages() {
        // control change, program change
        assert_eq!(decode(&[0xB0, 64, 127]).unwrap(), None);
        assert_eq!(decode(&[0xC0, 5]).unwrap(), None);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode(&[]), Err(MidiInputError::Malformed { .. })));
        assert!(matches!(decode(&[0x90, 60]), Err(MidiInputError::Malformed { .. })));
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_port_default_is_first() {
        assert_eq!(pick_port(&names(&["Piano", "Pads"]), None).unwrap(), 0);
        assert!(matches!(pick_port(&[], None), Err(MidiInputError::NoDevice)));
    }

    #[test]
    fn test_pick_port_by_index_or_name() {
        let ports = names(&["Midi Through", "Digital Piano MIDI 1"]);
        assert_eq!(pick_port(&ports, Some("1")).unwrap(), 1);
        assert_eq!(pick_port(&ports, Some("piano")).unwrap(), 1);
        assert!(matches!(
            pick_port(&ports, Some("organ")),
            Err(MidiInputError::UnknownPort(_))
        ));
    }

    #[test]
    fn test_pick_port_explicit_selector_without_ports() {
        assert!(matches!(
            pick_port(&[], Some("piano")),
            Err(MidiInputError::UnknownPort(_))
        ));
    }

    #[test]
    fn test_watch_reports_unplugged_port() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut calls = 0;
        let list = move || {
            calls += 1;
            if calls < 3 {
                Ok(names(&["Midi Through", "Piano"]))
            } else {
                Ok(names(&["Midi Through"]))
            }
        };
        let handle = watch_port("Piano".into(), list, tx, Duration::from_millis(1)).unwrap();
        handle.join().unwrap();

        let messages: Vec<_> = rx.iter().collect();
        assert_eq!(
            messages,
            vec![ListenerMessage::InputLost("MIDI device Piano disconnected".into())]
        );
    }

    #[test]
    fn test_watch_treats_listing_failure_as_loss() {
        let (tx, rx) = std::sync::mpsc::channel();
        let list = || Err(MidiInputError::Init("backend gone".into()));
        let handle = watch_port("Piano".into(), list, tx, Duration::from_millis(1)).unwrap();
        handle.join().unwrap();
        assert!(matches!(rx.recv(), Ok(ListenerMessage::InputLost(_))));
    }
}
