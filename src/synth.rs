use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;

use crate::chord::ChordPattern;
use crate::note::parse_pitch_name;

/// How long a hint sounds
pub const HINT_SECS: f64 = 1.5;

/// A command sent to the audio thread
enum AudioCommand {
    /// Play multiple frequencies simultaneously
    PlayChord { freqs: Vec<f64>, duration_secs: f64 },
    /// Cut off whatever is sounding
    Stop,
}

/// Sounds chords on the default output device. Keeps the stream alive for
/// as long as it exists.
pub struct HintPlayer {
    cmd_tx: mpsc::Sender<AudioCommand>,
    _stream: cpal::Stream,
}

impl HintPlayer {
    pub fn new() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no output audio device available")?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("failed to get default output config: {}", e))?;

        let sample_rate = config.sample_rate() as f64;
        let channels = config.channels().max(1) as usize;

        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();

        let mut phase: f64 = 0.0;
        let mut current_freqs: Vec<f64> = Vec::new();
        let mut frames_remaining: usize = 0;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Check for new commands (non-blocking)
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        match cmd {
                            AudioCommand::PlayChord { freqs, duration_secs } => {
                                current_freqs = freqs;
                                frames_remaining = (duration_secs * sample_rate) as usize;
                                phase = 0.0;
                            }
                            AudioCommand::Stop => {
                                current_freqs.clear();
                                frames_remaining = 0;
                            }
                        }
                    }

                    for frame in data.chunks_mut(channels) {
                        let value = if frames_remaining > 0 && !current_freqs.is_empty() {
                            let mut value = 0.0_f64;
                            for freq in &current_freqs {
                                value += (phase * freq * 2.0 * std::f64::consts::PI / sample_rate).sin();
                            }
                            // Fade the tail so the cut-off does not click
                            let fade = (frames_remaining as f64 / (0.05 * sample_rate)).min(1.0);
                            phase += 1.0;
                            frames_remaining -= 1;
                            value / current_freqs.len() as f64 * 0.3 * fade
                        } else {
                            0.0
                        };
                        for sample in frame.iter_mut() {
                            *sample = value as f32;
                        }
                    }
                },
                move |err| {
                    log::error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| format!("failed to build output stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("failed to play stream: {}", e))?;

        Ok(Self {
            cmd_tx,
            _stream: stream,
        })
    }

    /// Sound the chord's reference pitches together.
    pub fn play(&self, chord: &ChordPattern) -> Result<(), String> {
        let freqs = chord_freqs(chord)?;
        self.cmd_tx
            .send(AudioCommand::PlayChord {
                freqs,
                duration_secs: HINT_SECS,
            })
            .map_err(|_| "audio thread disconnected".to_string())
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }
}

fn chord_freqs(chord: &ChordPattern) -> Result<Vec<f64>, String> {
    chord
        .notes
        .iter()
        .map(|name| {
            parse_pitch_name(name)
                .map(|p| p.to_freq())
                .map_err(|e| e.to_string())
        })
        .collect()
}
