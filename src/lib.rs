//! **tilesession**: a declarative tiling window-manager session.
//!
//! A JSON configuration describes key bindings, named groups with window
//! placement rules, a layout preference list, floating rules and the
//! per-screen bar.  It is built into an immutable
//! [`descriptor::SessionDescriptor`] that a [`session::Session`] consults
//! while reacting to events from the compositor.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Runtime`]: the window manager's command surface (queries,
//!   commands, spawning, notifications).  The session never mutates window
//!   state itself.
//! * [`traits::EventSource`]: the transport that delivers events (the
//!   compositor's event stream, a Unix socket, a polling timer) so the main
//!   loop is not coupled to any specific IPC mechanism.
//!
//! Lifecycle hooks ([`hooks`]) run synchronously on the event loop.  The
//! bar contents are rendered as [`bar::BarFrame`]s for an external bar
//! program.
//! Concrete implementations live in [`hyprland`] (Hyprland IPC), [`ipc`]
//! (Unix-socket event listener) and [`poll`] (widget polling).

pub mod bar;
pub mod binding;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod event;
pub mod group;
pub mod hooks;
pub mod hyprland;
pub mod ipc;
pub mod layout;
pub mod poll;
pub mod session;
pub mod spawn;
pub mod traits;
pub mod widget;

#[cfg(test)]
mod testing;
