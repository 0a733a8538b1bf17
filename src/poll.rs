//! Background polling for text widgets.
//!
//! A [`PollWorker`] runs one shell command on a fixed interval and forwards
//! its trimmed output as [`Event::PollText`].  Each worker gets its own
//! thread; it stops when its stop flag is raised or as soon as the event
//! loop drops its receiver.
//!
//! [`PollSet`] keeps the running workers in line with the descriptor's poll
//! widgets, so a reload that adds, drops or re-times a widget restarts only
//! the workers concerned.

use crate::event::Event;
use crate::spawn::{capture_shell, SpawnError};
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Error from a poll worker.  Command failures are logged, not returned.
#[derive(Debug, thiserror::Error)]
#[error("poll worker error: {0}")]
pub struct PollError(String);

/// Produces the text for one poll.
type Capture = Box<dyn FnMut(&str) -> Result<String, SpawnError> + Send>;

/// Periodically runs `sh -c <command>`.
pub struct PollWorker {
    command: String,
    interval: Duration,
    capture: Capture,
    stop: Arc<AtomicBool>,
}

impl PollWorker {
    /// A worker that polls `command` every `interval`.
    pub fn new(command: impl Into<String>, interval: Duration) -> Self {
        Self {
            command: command.into(),
            interval,
            capture: Box::new(capture_shell),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    #[cfg(test)]
    fn with_capture(
        command: &str,
        interval: Duration,
        capture: impl FnMut(&str) -> Result<String, SpawnError> + Send + 'static,
    ) -> Self {
        Self {
            command: command.into(),
            interval,
            capture: Box::new(capture),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag makes the worker return at its next wakeup.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

impl EventSource for PollWorker {
    type Error = PollError;

    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), PollError> {
        if self.interval.is_zero() {
            return Err(PollError(format!("{}: interval must be positive", self.command)));
        }
        info!("polling {:?} every {:?}", self.command, self.interval);
        while !self.stopped() {
            match (self.capture)(&self.command) {
                // Output of a command that was stopped mid-run is stale.
                Ok(_) if self.stopped() => break,
                Ok(text) => {
                    let event = Event::PollText {
                        command: self.command.clone(),
                        text,
                    };
                    if sink.send(event).is_err() {
                        debug!("receiver dropped, stopping poll of {:?}", self.command);
                        return Ok(());
                    }
                }
                Err(e) => warn!("poll {:?}: {}", self.command, e),
            }
            std::thread::sleep(self.interval);
        }
        debug!("poll of {:?} stopped", self.command);
        Ok(())
    }
}

/// The set of running poll workers, keyed by command.
pub struct PollSet {
    sink: mpsc::Sender<Event>,
    running: HashMap<String, (Duration, Arc<AtomicBool>)>,
}

impl PollSet {
    /// Workers started by this set deliver into `sink`.
    pub fn new(sink: mpsc::Sender<Event>) -> Self {
        Self {
            sink,
            running: HashMap::new(),
        }
    }

    /// Stop workers that are no longer wanted (or whose interval changed)
    /// and start the missing ones.
    pub fn sync(&mut self, wanted: &[(String, Duration)]) {
        self.running.retain(|command, (interval, stop)| {
            let keep = wanted.iter().any(|(c, i)| c == command && i == interval);
            if !keep {
                info!("stopping poll of {:?}", command);
                stop.store(true, Ordering::Relaxed);
            }
            keep
        });

        for (command, interval) in wanted {
            if self.running.contains_key(command) {
                continue;
            }
            let mut worker = PollWorker::new(command.clone(), *interval);
            self.running
                .insert(command.clone(), (*interval, worker.stop_handle()));
            let sink = self.sink.clone();
            std::thread::spawn(move || {
                if let Err(e) = worker.run(sink) {
                    error!("{}", e);
                }
            });
        }
    }

    /// Commands currently being polled, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.running.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    /// Stop every worker.
    pub fn clear(&mut self) {
        self.sync(&[]);
    }
}

impl Drop for PollSet {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_text_until_receiver_dropped() {
        let mut n = 0;
        let mut worker = PollWorker::with_capture("count", Duration::from_millis(1), move |_| {
            n += 1;
            Ok(n.to_string())
        });
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || worker.run(tx));

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(
            first,
            Event::PollText {
                command: "count".into(),
                text: "1".into()
            }
        );
        assert!(matches!(second, Event::PollText { ref text, .. } if text == "2"));

        drop(rx);
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn failed_poll_delivers_nothing() {
        let mut calls = 0;
        let mut worker = PollWorker::with_capture("flaky", Duration::from_millis(1), move |_| {
            calls += 1;
            if calls == 1 {
                Err(SpawnError::Empty)
            } else {
                Ok("ok".into())
            }
        });
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || worker.run(tx));
        match rx.recv().unwrap() {
            Event::PollText { text, .. } => assert_eq!(text, "ok"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut worker = PollWorker::with_capture("x", Duration::ZERO, |_| Ok(String::new()));
        let (tx, _rx) = mpsc::channel();
        assert!(worker.run(tx).is_err());
    }

    #[test]
    fn runs_shell_command() {
        let mut worker = PollWorker::new("echo '  hello  '", Duration::from_millis(1));
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || worker.run(tx));
        match rx.recv().unwrap() {
            Event::PollText { text, .. } => assert_eq!(text, "hello"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn raised_stop_flag_ends_the_worker() {
        let mut worker = PollWorker::with_capture("tick", Duration::from_millis(1), |_| Ok("t".into()));
        let stop = worker.stop_handle();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || worker.run(tx));
        assert!(rx.recv().is_ok());
        stop.store(true, Ordering::Relaxed);
        assert!(handle.join().unwrap().is_ok());
        // The worker is gone, so the channel drains and disconnects.
        while rx.recv_timeout(Duration::from_secs(1)).is_ok() {}
        assert!(matches!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected)));
    }

    /// Texts received within `window`.
    fn collect(rx: &mpsc::Receiver<Event>, window: Duration) -> Vec<String> {
        let deadline = std::time::Instant::now() + window;
        let mut texts = Vec::new();
        while let Some(left) = deadline.checked_duration_since(std::time::Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(Event::PollText { text, .. }) => texts.push(text),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        texts
    }

    #[test]
    fn set_follows_the_wanted_commands() {
        let (tx, rx) = mpsc::channel();
        let mut set = PollSet::new(tx);
        let every = Duration::from_millis(10);

        set.sync(&[("echo a".into(), every)]);
        assert_eq!(set.commands(), vec!["echo a"]);
        assert!(collect(&rx, Duration::from_millis(300)).iter().any(|t| t == "a"));

        set.sync(&[("echo b".into(), every)]);
        assert_eq!(set.commands(), vec!["echo b"]);
        // Let the old worker notice its stop flag, then only `b` arrives.
        collect(&rx, Duration::from_millis(300));
        let later = collect(&rx, Duration::from_millis(200));
        assert!(later.iter().any(|t| t == "b"));
        assert!(later.iter().all(|t| t == "b"), "{later:?}");

        set.clear();
        assert!(set.commands().is_empty());
        collect(&rx, Duration::from_millis(300));
        assert!(collect(&rx, Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn changed_interval_restarts_the_worker() {
        let (tx, _rx) = mpsc::channel();
        let mut set = PollSet::new(tx);
        set.sync(&[("true".into(), Duration::from_secs(5))]);
        let first = Arc::clone(&set.running["true"].1);
        set.sync(&[("true".into(), Duration::from_secs(5))]);
        assert!(!first.load(Ordering::Relaxed));
        set.sync(&[("true".into(), Duration::from_secs(1))]);
        assert!(first.load(Ordering::Relaxed));
        assert_eq!(set.running["true"].0, Duration::from_secs(1));
    }
}
