//! Unix-socket [`EventSource`] implementation.
//!
//! Key-bind helpers and scripts connect to
//! `$XDG_RUNTIME_DIR/tilesession.sock` and write one event per line.  A
//! line is either a JSON-encoded [`Event`] or a bare chord:
//!
//! ```text
//! {"Key":"mod+shift+j"}
//! "FocusChanged"
//! "Reload"
//! mod+shift+j
//! ```
//!
//! A compositor binding can therefore forward a key with
//! `echo mod+j | socat - UNIX-CONNECT:$XDG_RUNTIME_DIR/tilesession.sock`.
//! Chords are checked for syntax here and resolved by the session, which
//! knows the configured main modifier.

use crate::command::{Chord, Modifier};
use crate::event::Event;
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// An [`EventSource`] that accepts events over a Unix stream socket.
///
/// Connections are served one at a time; each may send any number of
/// lines.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.  Malformed lines are
/// logged and skipped, so only socket failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](EventSource::run) is called
    /// and removed whenever `run` returns.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Removes the socket file when dropped.
struct BoundPath<'a>(&'a Path);

impl Drop for BoundPath<'_> {
    fn drop(&mut self) {
        match std::fs::remove_file(self.0) {
            Ok(()) => debug!("removed {}", self.0.display()),
            Err(e) => debug!("could not remove {}: {}", self.0.display(), e),
        }
    }
}

/// Turn one received line into an event.
///
/// Returns `None` for blank lines, malformed JSON and chords that cannot
/// parse.
fn decode_line(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let event = if line.starts_with('{') || line.starts_with('"') {
        match serde_json::from_str::<Event>(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("bad event {:?}: {}", line, e);
                return None;
            }
        }
    } else if line.contains(char::is_whitespace) {
        warn!("bad event {:?}: neither JSON nor a chord", line);
        return None;
    } else {
        Event::Key(line.to_string())
    };

    if let Event::Key(keys) = &event {
        // Syntax does not depend on which modifier `mod` stands for.
        if let Err(e) = Chord::parse(keys, Modifier::Mod4) {
            warn!("bad key {:?}: {}", keys, e);
            return None;
        }
    }
    Some(event)
}

/// Forward every event sent over `stream`.
///
/// Returns `false` once `sink` is closed.
fn serve(stream: UnixStream, sink: &mpsc::Sender<Event>) -> bool {
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("read error: {}", e);
                break;
            }
        };
        let Some(event) = decode_line(&line) else {
            continue;
        };
        debug!("received {:?}", event);
        if sink.send(event).is_err() {
            return false;
        }
    }
    true
}

impl EventSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and serve connections until the sink closes.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        // A previous instance may have left its socket behind.
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        let listener = UnixListener::bind(&self.path)?;
        let _bound = BoundPath(&self.path);
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            };
            debug!("client connected");
            if !serve(stream, &sink) {
                info!("sink closed, shutting down");
                return Ok(());
            }
            debug!("client disconnected");
        }
        Ok(())
    }
}
