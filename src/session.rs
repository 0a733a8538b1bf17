//! The orchestrator that ties the descriptor, hooks and runtime together.
//!
//! [`Session`] owns the current [`SessionDescriptor`] and reacts to
//! [`Event`]s by resolving bindings, placing windows and emitting hooks.
//! Every change to window or group state goes through the [`Runtime`].
//!
//! The session also remembers each group's layout.  Groups start in their
//! configured layout, `NextLayout` cycles the focused group through the
//! preference list, and the runtime is told whenever the layout of the
//! focused group differs from the one it last applied.

use crate::bar::{render_frames, BarFrame, BarState};
use crate::command::{Action, Chord, RuntimeCommand, ScreenInfo, WindowInfo};
use crate::config::Config;
use crate::descriptor::SessionDescriptor;
use crate::event::Event;
use crate::hooks::{HookBus, HookContext, HookEvent};
use crate::layout::LayoutKind;
use crate::traits::Runtime;
use chrono::{DateTime, TimeZone};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;

/// Possible errors from the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A runtime query needed to handle the event failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}

fn runtime_err(e: impl fmt::Display) -> SessionError {
    SessionError::Runtime(e.to_string())
}

/// Loads a fresh [`Config`] on startup and on every reload.
pub type ConfigSource = Box<dyn Fn() -> Config>;

/// Reacts to events on behalf of one window-manager session.
///
/// # Typical usage
///
/// ```ignore
/// let mut session = Session::new(HyprlandRuntime::new(), Box::new(load_config));
/// session.handle(Event::Startup)?;
/// ```
pub struct Session<R: Runtime + 'static> {
    runtime: R,
    descriptor: SessionDescriptor,
    hooks: HookBus<R>,
    config_source: ConfigSource,
    /// Survives reloads so startup hooks run once per process.
    started: bool,
    poll_text: HashMap<String, String>,
    /// Groups whose layout was changed with `NextLayout`.
    layouts: HashMap<String, LayoutKind>,
    /// Layout the runtime was last told to use.
    applied_layout: Option<LayoutKind>,
}

impl<R: Runtime + 'static> Session<R> {
    /// Build the initial descriptor and install the default hooks.
    pub fn new(runtime: R, config_source: ConfigSource) -> Self {
        let (descriptor, warnings) = SessionDescriptor::build(&config_source());
        info!(
            "session descriptor built: {} binding(s), {} group(s), {} warning(s)",
            descriptor.bindings.len(),
            descriptor.groups.len(),
            warnings.len()
        );
        Self {
            runtime,
            descriptor,
            hooks: HookBus::with_defaults(),
            config_source,
            started: false,
            poll_text: HashMap::new(),
            layouts: HashMap::new(),
            applied_layout: None,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    /// Register additional hooks.
    pub fn hooks_mut(&mut self) -> &mut HookBus<R> {
        &mut self.hooks
    }

    /// Process a single event.
    pub fn handle(&mut self, event: Event) -> Result<(), SessionError> {
        match event {
            Event::Startup => {
                // A restarted runtime has lost everything we pushed to it.
                self.apply_descriptor();
                self.applied_layout = None;
                self.sync_layout();
                if self.started {
                    debug!("startup hooks already ran, ignoring");
                    return Ok(());
                }
                self.started = true;
                info!("session started");
                self.emit(HookEvent::StartupOnce, None);
            }

            Event::Key(keys) => self.key(&keys),

            Event::WindowManaged(window) => self.manage(window)?,

            Event::FocusChanged => {
                debug!("focus changed");
                self.sync_layout();
                self.emit(HookEvent::FocusChange, None);
            }

            Event::Reload => self.reload(),

            Event::PollText { command, text } => {
                debug!("poll {:?} -> {:?}", command, text);
                self.poll_text.insert(command, text);
            }
        }
        Ok(())
    }

    /// Rebuild the descriptor from a fresh configuration and push it to the
    /// runtime.
    ///
    /// Hooks and the startup guard are kept.  Layout choices and poll output
    /// that the new descriptor no longer covers are dropped.
    pub fn reload(&mut self) {
        let (descriptor, warnings) = SessionDescriptor::build(&(self.config_source)());
        info!("configuration reloaded ({} warning(s))", warnings.len());
        self.descriptor = descriptor;

        let kinds: Vec<LayoutKind> = self.descriptor.layouts.iter().map(|l| l.kind).collect();
        let groups = &self.descriptor.groups;
        self.layouts
            .retain(|group, kind| kinds.contains(kind) && groups.get(group).is_some());
        let polled = SessionDescriptor::poll_widgets(&self.descriptor.screens);
        self.poll_text
            .retain(|command, _| polled.iter().any(|(c, _)| c == command));

        self.apply_descriptor();
        self.applied_layout = None;
        self.sync_layout();
    }

    /// The layout `group` is currently in.
    pub fn layout_of(&self, group: &str) -> LayoutKind {
        self.layouts
            .get(group)
            .copied()
            .unwrap_or_else(|| self.descriptor.initial_layout(group))
    }

    /// Render the bar of every active screen.
    pub fn bar_frames<Tz>(
        &self,
        screens: &[ScreenInfo],
        now: &DateTime<Tz>,
    ) -> Result<Vec<BarFrame>, SessionError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let windows = self.runtime.windows().map_err(runtime_err)?;
        let focused = self.runtime.focused_window().map_err(runtime_err)?;
        let state = BarState {
            descriptor: &self.descriptor,
            screens,
            windows: &windows,
            focused_window: focused.as_ref(),
            layouts: &self.layouts,
            poll_text: &self.poll_text,
        };
        Ok(render_frames(&state, now))
    }

    fn apply_descriptor(&self) {
        match self.runtime.apply(&self.descriptor) {
            Ok(()) => debug!("descriptor applied to runtime"),
            Err(e) => warn!("failed to apply descriptor: {}", e),
        }
    }

    /// Tell the runtime about the focused group's layout if it changed.
    fn sync_layout(&mut self) {
        let group = match self.runtime.current_group() {
            Ok(Some(group)) => group,
            Ok(None) => return,
            Err(e) => {
                warn!("cannot determine the focused group: {}", e);
                return;
            }
        };
        let kind = self.layout_of(&group);
        if self.applied_layout == Some(kind) {
            return;
        }
        debug!("group {} uses {}", group, kind);
        match self.runtime.execute(&RuntimeCommand::SetLayout(kind)) {
            Ok(()) => self.applied_layout = Some(kind),
            Err(e) => warn!("cannot switch to {}: {}", kind, e),
        }
    }

    /// Move the focused group to the next layout in the preference list.
    fn next_layout(&mut self) -> Result<(), SessionError> {
        let Some(group) = self.runtime.current_group().map_err(runtime_err)? else {
            return Ok(());
        };
        let kinds: Vec<LayoutKind> = self.descriptor.layouts.iter().map(|l| l.kind).collect();
        let current = self.layout_of(&group);
        let next = kinds
            .iter()
            .position(|&k| k == current)
            .map_or(0, |i| (i + 1) % kinds.len());
        let Some(&kind) = kinds.get(next) else {
            return Ok(());
        };
        info!("group {}: {} -> {}", group, current, kind);
        self.layouts.insert(group, kind);
        self.sync_layout();
        Ok(())
    }

    fn emit(&mut self, event: HookEvent, window: Option<&WindowInfo>) {
        let ctx = HookContext {
            runtime: &self.runtime,
            descriptor: &self.descriptor,
        };
        let failures = self.hooks.emit(event, &ctx, window);
        if failures > 0 {
            debug!("{}: {} hook(s) failed", event, failures);
        }
    }

    /// Resolve `keys` against the current main modifier and run its action.
    fn key(&mut self, keys: &str) {
        let chord = match Chord::parse(keys, self.descriptor.modifier) {
            Ok(chord) => chord,
            Err(e) => {
                warn!("ignoring key {:?}: {}", keys, e);
                return;
            }
        };
        let Some(action) = self.descriptor.bindings.lookup(&chord).cloned() else {
            debug!("{} is not bound", chord);
            return;
        };
        info!("{} -> {}", chord, action);
        let result = match &action {
            Action::Spawn(request) => self.runtime.spawn(request).map_err(runtime_err),
            Action::Command(RuntimeCommand::NextLayout) => self.next_layout(),
            Action::Command(command) => self.runtime.execute(command).map_err(runtime_err),
        };
        if let Err(e) = result {
            warn!("{} failed: {}", action, e);
            if let Err(e) = self.runtime.notify(&format!("{}: {}", action, e)) {
                warn!("notify failed: {}", e);
            }
        }
        if action == Action::Command(RuntimeCommand::ReloadConfig) {
            self.reload();
        }
    }

    /// Place a newly managed window, float it if a rule says so, then emit
    /// [`HookEvent::ClientManaged`].
    fn manage(&mut self, mut window: WindowInfo) -> Result<(), SessionError> {
        let target = match self.descriptor.groups.classify(&window) {
            Some(group) => Some(group.name.clone()),
            None => match self.runtime.current_group() {
                Ok(current) => current.or_else(|| window.group.clone()),
                Err(e) => {
                    warn!("focused group unknown ({}), leaving {} in place", e, window.address);
                    window.group.clone()
                }
            },
        };

        if let Some(group) = target {
            if window.group.as_deref() != Some(group.as_str()) {
                info!("placing {} ({}) in group {}", window.address, window.class, group);
                self.runtime
                    .execute(&RuntimeCommand::MoveWindowToGroup {
                        window: window.address.clone(),
                        group: group.clone(),
                    })
                    .map_err(runtime_err)?;
            }
            window.group = Some(group);
        }

        if !window.floating && self.descriptor.floating.should_float(&window) {
            debug!("floating {} ({})", window.address, window.class);
            self.runtime
                .execute(&RuntimeCommand::FloatWindow(window.address.clone()))
                .map_err(runtime_err)?;
            window.floating = true;
        }

        self.emit(HookEvent::ClientManaged, Some(&window));
        Ok(())
    }
}
