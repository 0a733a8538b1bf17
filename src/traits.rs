//! Core traits that decouple tilesession from any specific window manager or
//! transport mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket listener, a test harness,
//! …) implements one of these traits.  The
//! [`Session`](crate::session::Session) only depends on these abstractions.

use crate::command::{RuntimeCommand, ScreenInfo, SpawnRequest, WindowInfo};
use crate::descriptor::SessionDescriptor;
use crate::event::Event;
use std::sync::mpsc;

/// The window-manager runtime's command surface.
///
/// The runtime owns the live window/group graph; the session only reads it
/// through these queries and asks for changes through
/// [`execute`](Runtime::execute).
pub trait Runtime {
    /// The error type produced by this runtime.
    type Error: std::error::Error + Send + 'static;

    /// Physical screens in output order, with the group each one shows.
    fn screens(&self) -> Result<Vec<ScreenInfo>, Self::Error>;

    /// Every managed window.
    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error>;

    /// The window that has keyboard focus, if any.
    fn focused_window(&self) -> Result<Option<WindowInfo>, Self::Error>;

    /// Push the descriptor's runtime-side settings (theme, mouse bindings,
    /// focus behaviour) into the runtime.
    ///
    /// Called on every startup and after every reload, so implementations
    /// must be idempotent.
    fn apply(&self, descriptor: &SessionDescriptor) -> Result<(), Self::Error>;

    /// Carry out a command.
    fn execute(&self, command: &RuntimeCommand) -> Result<(), Self::Error>;

    /// Launch a process without waiting for it.
    fn spawn(&self, request: &SpawnRequest) -> Result<(), Self::Error>;

    /// Show a transient, user-visible message.
    fn notify(&self, message: &str) -> Result<(), Self::Error>;

    /// The screen that currently has focus, as the runtime defines it.
    fn focused_screen(&self) -> Result<Option<ScreenInfo>, Self::Error> {
        Ok(self.screens()?.into_iter().find(|s| s.focused))
    }

    /// Name of the group shown on the focused screen.
    fn current_group(&self) -> Result<Option<String>, Self::Error> {
        Ok(self.focused_screen()?.and_then(|s| s.group))
    }
}

/// A source of [`Event`]s.
///
/// Implementations listen on some transport (a Unix socket, the
/// compositor's event stream, a polling timer) and forward events into the
/// provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted, the
///   sink is closed, or an unrecoverable error occurs.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Event`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecorderRuntime;

    #[test]
    fn focused_screen_and_current_group() {
        let rt = RecorderRuntime::two_screens();
        let focused = rt.focused_screen().unwrap().unwrap();
        assert_eq!(focused.name, "DP-1");
        assert_eq!(rt.current_group().unwrap(), Some("1".to_string()));
    }

    #[test]
    fn no_focused_screen_means_no_current_group() {
        let rt = RecorderRuntime::two_screens();
        for s in rt.screens.borrow_mut().iter_mut() {
            s.focused = false;
        }
        assert_eq!(rt.current_group().unwrap(), None);
    }

    #[test]
    fn failing_queries_surface_as_errors() {
        let rt = RecorderRuntime::two_screens();
        rt.fail_queries.set(true);
        assert!(rt.focused_screen().is_err());
        assert!(rt.current_group().is_err());
    }

    //  Mock EventSource

    /// A test double that emits a fixed sequence of events.
    struct MockSource {
        events: Vec<Event>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    impl EventSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), MockError> {
            for ev in self.events.drain(..) {
                let _ = sink.send(ev);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_events() {
        let mut src = MockSource {
            events: vec![Event::Startup, Event::Key("mod+j".into())],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(events, vec![Event::Startup, Event::Key("mod+j".into())]);
    }
}
