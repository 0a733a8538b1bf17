//! Events delivered from the runtime side to the session.
//!
//! Every [`EventSource`](crate::traits::EventSource) produces [`Event`]s; the
//! main loop hands each one to [`Session::handle`](crate::session::Session::handle).
//!
//! # Wire format
//!
//! The Unix-socket listener accepts one JSON value per line:
//!
//! ```json
//! "Startup"
//! {"Key":"mod+shift+j"}
//! {"WindowManaged":{"address":"0x5e1a","class":"discord","title":"Friends"}}
//! "FocusChanged"
//! "Reload"
//! ```
//!
//! Key chords travel as text.  The session parses them against its current
//! main modifier, so `mod` follows the configuration across reloads.

use crate::command::WindowInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// The session has started.  Delivered again after a runtime restart,
    /// but the startup hooks only ever run once per process.
    Startup,
    /// A key chord was pressed, in [`Chord::parse`](crate::command::Chord::parse)
    /// syntax.
    Key(String),
    /// The runtime started managing a new window.
    WindowManaged(WindowInfo),
    /// Screen or window focus changed.
    FocusChanged,
    /// Re-read the configuration and rebuild the descriptor.
    Reload,
    /// Fresh output from a polled widget command.
    PollText { command: String, text: String },
}
