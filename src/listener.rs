use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::engine::{ChordEngine, NoteEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerMessage {
    /// The held notes formed this chord; the held set has been cleared.
    Matched(&'static str),
    /// The note source went away, e.g. the MIDI device was unplugged.
    InputLost(String),
}

/// Spawn the listener, the only owner of the chord engine. Input sources
/// forward decoded events to it and it reports matched chords to `out`, so
/// the held-note set is never touched from the display loop.
///
/// It runs until all event senders are dropped or the display side hangs up.
pub fn spawn(
    events: Receiver<NoteEvent>,
    out: Sender<ListenerMessage>,
) -> Result<JoinHandle<()>, String> {
    thread::Builder::new()
        .name("chord-listener".into())
        .spawn(move || run(events, out))
        .map_err(|e| format!("failed to spawn listener thread: {}", e))
}

fn run(events: Receiver<NoteEvent>, out: Sender<ListenerMessage>) {
    let mut engine = ChordEngine::new();

    for event in events.iter() {
        let chord = engine.on_note_event(event);
        log::debug!(
            "{:?} {} vel {} -> held [{}]",
            event.kind,
            event.pitch,
            event.velocity,
            engine.held_notes().join(" ")
        );

        if let Some(label) = chord {
            log::info!("press: {}", label);
            if out.send(ListenerMessage::Matched(label)).is_err() {
                log::debug!("display closed, stopping listener");
                return;
            }
        }
    }

    log::info!("note input closed, stopping listener");
}
