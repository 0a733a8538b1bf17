//! IPC listener that accepts session events over a Unix socket.
//!
//! Key-bind helpers and scripts connect to the socket and send
//! newline-delimited JSON [`Event`](crate::event::Event)s.

pub mod listener;
