//! Entry point for the **tilesession** daemon.
//!
//! Spawns every [`EventSource`](tilesession::traits::EventSource) on a
//! background thread and processes incoming events on the main thread.
//! After every event, and at least once a second, the bar frames are
//! rendered; frames that changed are printed to stdout as JSON lines for a
//! bar program to draw.
//!
//! ```text
//! tilesession                      run the session daemon
//! tilesession --check              build the descriptor and report problems
//! tilesession --dump               print the resolved descriptor as JSON
//! tilesession --shorten <title>    print the shortened window title
//! tilesession --config <path> ...  use another configuration file
//! ```

use chrono::Local;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tilesession::bar::BarFrame;
use tilesession::config::Config;
use tilesession::descriptor::SessionDescriptor;
use tilesession::event::Event;
use tilesession::hyprland::events::HyprlandEvents;
use tilesession::hyprland::runtime::HyprlandRuntime;
use tilesession::ipc::listener::UnixSocketListener;
use tilesession::poll::PollSet;
use tilesession::session::Session;
use tilesession::traits::{EventSource, Runtime};
use tilesession::widget::shorten_title;

/// Longest wait between two bar refreshes.
const TICK: Duration = Duration::from_secs(1);

/// Default socket path for the event listener.
fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tilesession.sock")
}

/// `$XDG_CONFIG_HOME/tilesession/config.json`.
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tilesession")
        .join("config.json")
}

/// Load the config at `path`, falling back to compiled-in defaults.
fn load_config(path: &Path) -> Config {
    match Config::load(path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("{}, using defaults", e);
            Config::default()
        }
    }
}

enum Mode {
    Daemon,
    Check,
    Dump,
    Shorten(String),
}

struct Args {
    mode: Mode,
    config: PathBuf,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        mode: Mode::Daemon,
        config: default_config_path(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--check" => args.mode = Mode::Check,
            "--dump" => args.mode = Mode::Dump,
            "--shorten" => {
                let title = it.next().ok_or("--shorten needs a title")?;
                args.mode = Mode::Shorten(title);
            }
            "--config" => {
                let path = it.next().ok_or("--config needs a path")?;
                args.config = PathBuf::from(path);
            }
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    Ok(args)
}

//  Main

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    match args.mode {
        Mode::Daemon => run_daemon(args.config),
        Mode::Check => run_check(&args.config),
        Mode::Dump => run_dump(&args.config),
        Mode::Shorten(title) => println!("{}", shorten_title(&title)),
    }
}

/// Build the descriptor, print every warning and exit non-zero if any.
fn run_check(path: &Path) {
    let (descriptor, warnings) = SessionDescriptor::build(&load_config(path));
    for w in &warnings {
        println!("warning: {}", w);
    }
    println!(
        "{} binding(s), {} group(s), {} screen(s), {} warning(s)",
        descriptor.bindings.len(),
        descriptor.groups.len(),
        descriptor.screens.len(),
        warnings.len()
    );
    if !warnings.is_empty() {
        std::process::exit(1);
    }
}

fn run_dump(path: &Path) {
    let (descriptor, _) = SessionDescriptor::build(&load_config(path));
    match serde_json::to_string_pretty(&descriptor) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("failed to serialize descriptor: {}", e);
            std::process::exit(1);
        }
    }
}

/// Normal daemon mode.
fn run_daemon(config_path: PathBuf) {
    let runtime = HyprlandRuntime::new();
    let outputs = match runtime.screens() {
        Ok(s) => {
            info!("found {} screen(s)", s.len());
            s.len()
        }
        Err(e) => {
            error!("failed to query screens: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = Session::new(runtime, Box::new(move || load_config(&config_path)));
    let configured = session.descriptor().screens.len();
    if outputs < configured {
        info!(
            "{} configured screen(s) have no output and stay inert",
            configured - outputs
        );
    }

    let (tx, rx) = mpsc::channel::<Event>();
    spawn_event_sources(tx.clone());
    let mut polls = PollSet::new(tx);

    if let Err(e) = session.handle(Event::Startup) {
        error!("startup error: {}", e);
    }

    info!("tilesession running");
    let mut frames = Vec::new();
    loop {
        match rx.recv_timeout(TICK) {
            Ok(event) => {
                if let Err(e) = session.handle(event) {
                    error!("event error: {}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        refresh(&session, &mut polls, &mut frames);
    }
    info!("all event sources closed, exiting");
}

/// Match the poll workers to the current descriptor and print the bar
/// frames if they changed since `last`.
fn refresh(session: &Session<HyprlandRuntime>, polls: &mut PollSet, last: &mut Vec<BarFrame>) {
    let screens = match session.runtime().screens() {
        Ok(screens) => screens,
        Err(e) => {
            warn!("failed to query screens: {}", e);
            return;
        }
    };
    let active = session.descriptor().active_screens(screens.len());
    polls.sync(&SessionDescriptor::poll_widgets(active));

    let frames = match session.bar_frames(&screens, &Local::now()) {
        Ok(frames) => frames,
        Err(e) => {
            warn!("failed to render bar: {}", e);
            return;
        }
    };
    if frames == *last {
        return;
    }
    for frame in &frames {
        match serde_json::to_string(frame) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to serialize bar frame: {}", e),
        }
    }
    *last = frames;
}

//  Helpers

fn spawn_source<S>(name: &'static str, mut source: S, tx: mpsc::Sender<Event>)
where
    S: EventSource + 'static,
{
    std::thread::spawn(move || {
        if let Err(e) = source.run(tx) {
            error!("{} error: {}", name, e);
        }
    });
}

fn spawn_event_sources(tx: mpsc::Sender<Event>) {
    spawn_source(
        "socket listener",
        UnixSocketListener::new(default_socket_path()),
        tx.clone(),
    );
    spawn_source("hyprland events", HyprlandEvents::new(), tx);
}
