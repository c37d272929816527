mod chord;
mod display;
mod engine;
mod keyboard;
mod listener;
mod midi;
mod note;
mod session;
mod synth;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs::File;
use std::path::PathBuf;
use std::sync::mpsc;

use display::InputSource;
use midi::MidiInputError;
use session::Session;

#[derive(Parser)]
#[command(name = "chordtrainer", about = "Chord ear-training game for MIDI keyboards")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where to write the log (default: chordtrainer.log in the temp dir)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show random chords and listen for them on a MIDI input
    Play {
        /// MIDI input to use, by index or name (default: first port)
        #[arg(long)]
        port: Option<String>,

        /// Play with the computer keyboard instead of a MIDI device
        #[arg(long)]
        keyboard: bool,

        /// Seed for the chord sequence
        #[arg(long)]
        seed: Option<u64>,

        /// Disable the Space-bar chord hint
        #[arg(long)]
        mute: bool,

        /// Keyboard notes release after this long when the terminal
        /// does not report key releases
        #[arg(long, default_value_t = 1000)]
        hold_ms: u64,
    },

    /// List MIDI input ports
    Ports,

    /// Print the chord dictionary in match order
    Chords,

    /// Print the name of a MIDI pitch number
    Name {
        /// Pitch number, 0-127
        #[arg(allow_negative_numbers = true)]
        pitch: i64,
    },
}

struct PlayOptions {
    port: Option<String>,
    keyboard: bool,
    seed: Option<u64>,
    mute: bool,
    hold_ms: u64,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Play {
            port,
            keyboard,
            seed,
            mute,
            hold_ms,
        } => {
            init_logging(cli.verbose, cli.log_file);
            play(PlayOptions {
                port,
                keyboard,
                seed,
                mute,
                hold_ms,
            })
        }
        Command::Ports => print_ports(),
        Command::Chords => {
            print_chords();
            Ok(())
        }
        Command::Name { pitch } => note::Pitch::new(pitch)
            .map(|p| println!("{}", note::name_of(p)))
            .map_err(|e| e.to_string()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// The game owns the terminal, so log to a file.
fn init_logging(verbose: bool, path: Option<PathBuf>) {
    use simplelog::*;

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_path = path.unwrap_or_else(|| std::env::temp_dir().join("chordtrainer.log"));

    match File::create(&log_path) {
        Ok(log_file) => {
            if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
                eprintln!("logger already initialized");
            }
        }
        Err(e) => eprintln!("cannot create log file {}: {}", log_path.display(), e),
    }

    log::info!("chordtrainer starting (log level: {:?})", log_level);
}

fn play(opts: PlayOptions) -> Result<(), String> {
    let (note_tx, note_rx) = mpsc::channel();
    let (message_tx, message_rx) = mpsc::channel();
    let listener = listener::spawn(note_rx, message_tx.clone())?;

    let keyboard_source = InputSource::Keyboard {
        hold_ms: opts.hold_ms,
    };
    let mut notice = None;

    let (source, midi_source, keyboard) = if opts.keyboard {
        (keyboard_source, None, Some(note_tx))
    } else {
        match midi::connect(opts.port.as_deref(), note_tx.clone()) {
            Ok(src) => {
                drop(note_tx);
                let _ = midi::watch_port(
                    src.port_name.clone(),
                    midi::list_ports,
                    message_tx,
                    midi::WATCH_INTERVAL,
                )?;
                (InputSource::Midi(src.port_name.clone()), Some(src), None)
            }
            Err(e @ (MidiInputError::NoDevice | MidiInputError::Init(_))) => {
                log::warn!("{}", e);
                notice = Some(format!("{} Using the computer keyboard.", e));
                (keyboard_source, None, Some(note_tx))
            }
            Err(e) => return Err(e.to_string()),
        }
    };

    let hint = if opts.mute {
        None
    } else {
        synth::HintPlayer::new()
            .map_err(|e| log::warn!("hints disabled: {}", e))
            .ok()
    };

    let rng = match opts.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let mut session = Session::new(rng);

    let result = display::run(&mut session, message_rx, keyboard, source, hint, notice);

    // Closing the input lets the listener drain and exit. The port watcher is
    // left to finish on its own; its next send fails harmlessly.
    drop(midi_source);
    if listener.join().is_err() {
        log::error!("listener thread panicked");
    }

    log::info!(
        "session over: {} correct in {} rounds",
        session.wins(),
        session.rounds() - 1
    );
    result
}

fn print_ports() -> Result<(), String> {
    let ports = midi::list_ports().map_err(|e| e.to_string())?;
    if ports.is_empty() {
        println!("{}", MidiInputError::NoDevice);
    }
    for (index, name) in ports.iter().enumerate() {
        println!("{:>3}  {}", index, name);
    }
    Ok(())
}

fn print_chords() {
    for pattern in &chord::CHORD_PATTERNS {
        println!("{:<4} {}", pattern.label, pattern.notes.join(" "));
    }
}
