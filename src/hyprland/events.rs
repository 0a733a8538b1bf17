//! [`EventSource`] reading Hyprland's event socket (`socket2`).
//!
//! Hyprland writes one `EVENT>>DATA` line per event to
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`.
//! The lines we care about:
//!
//! | Event            | Data                          | Becomes                 |
//! |------------------|-------------------------------|-------------------------|
//! | `openwindow`     | `ADDR,WORKSPACE,CLASS,TITLE`  | `Event::WindowManaged`  |
//! | `focusedmon`     | `MONITOR,WORKSPACE`           | `Event::FocusChanged`   |
//! | `activewindowv2` | `ADDR`                        | `Event::FocusChanged`   |
//! | `workspace`      | `WORKSPACE`                   | `Event::FocusChanged`   |
//!
//! `configreloaded` is not forwarded: a reload key already rebuilds the
//! session before asking Hyprland to reload.

use super::{socket_path, HyprlandError};
use crate::command::WindowInfo;
use crate::event::Event;
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;

/// Listens on Hyprland's event socket.
#[derive(Debug, Default)]
pub struct HyprlandEvents;

impl HyprlandEvents {
    pub fn new() -> Self {
        Self
    }
}

/// Split a socket2 line into `(event, data)`.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

/// Translate one socket2 event into a session event.
fn translate(event: &str, data: &str) -> Option<Event> {
    match event {
        "openwindow" => {
            // Titles may contain commas, so split at most four ways.
            let mut parts = data.splitn(4, ',');
            let address = parts.next().filter(|a| !a.is_empty())?;
            let workspace = parts.next()?;
            let class = parts.next()?;
            let title = parts.next().unwrap_or("");
            Some(Event::WindowManaged(WindowInfo {
                address: format!("0x{}", address.trim_start_matches("0x")),
                class: class.to_string(),
                title: title.to_string(),
                group: Some(workspace.to_string()).filter(|w| !w.is_empty()),
                ..WindowInfo::default()
            }))
        }
        "focusedmon" | "activewindowv2" | "workspace" => Some(Event::FocusChanged),
        _ => None,
    }
}

impl EventSource for HyprlandEvents {
    type Error = HyprlandError;

    /// Connect to socket2 and forward events until the stream ends or the
    /// receiver is dropped.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        let path = socket_path(".socket2.sock")?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;
        info!("connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    let Some(event) = parse_event_line(&line).and_then(|(e, d)| translate(e, d))
                    else {
                        continue;
                    };
                    debug!("socket2: {} -> {:?}", line, event);
                    if sink.send(event).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}
