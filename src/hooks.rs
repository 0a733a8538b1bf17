//! Lifecycle hooks and the typed event bus that dispatches them.
//!
//! Each [`HookEvent`] maps to an ordered list of callbacks.  Callbacks get a
//! [`HookContext`] (the runtime plus the current descriptor) and, for
//! [`HookEvent::ClientManaged`], the managed window.  A failing or panicking
//! callback is logged and skipped; the remaining callbacks still run.
//!
//! [`HookBus::with_defaults`] installs the session's three built-in hooks:
//!
//! | Event           | Hook                 | Effect                                             |
//! |-----------------|----------------------|----------------------------------------------------|
//! | `StartupOnce`   | [`autostart`]        | launch the autostart list                          |
//! | `FocusChange`   | [`raise_floating`]   | raise floating windows of the active group         |
//! | `ClientManaged` | [`auto_show_screen`] | show the window's group if no screen displays it   |

use crate::command::{RuntimeCommand, WindowInfo};
use crate::descriptor::SessionDescriptor;
use crate::traits::Runtime;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Named lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// First session start only; never on reload.
    StartupOnce,
    /// Screen or window focus changed.
    FocusChange,
    /// A new window has been placed in its group.
    ClientManaged,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::StartupOnce => write!(f, "startup_once"),
            HookEvent::FocusChange => write!(f, "focus_change"),
            HookEvent::ClientManaged => write!(f, "client_managed"),
        }
    }
}

/// State handed to every hook invocation.
pub struct HookContext<'a, R> {
    pub runtime: &'a R,
    pub descriptor: &'a SessionDescriptor,
}

/// Error returned by a hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("{failed} of {total} spawn(s) failed")]
    Spawn { failed: usize, total: usize },
}

fn runtime_err(e: impl fmt::Display) -> HookError {
    HookError::Runtime(e.to_string())
}

/// A registered callback.
pub type Hook<R> =
    Box<dyn FnMut(&HookContext<'_, R>, Option<&WindowInfo>) -> Result<(), HookError>>;

/// Ordered callbacks per [`HookEvent`].
pub struct HookBus<R> {
    hooks: HashMap<HookEvent, Vec<(String, Hook<R>)>>,
}

impl<R: Runtime + 'static> Default for HookBus<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runtime + 'static> HookBus<R> {
    /// An empty bus.
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// A bus with the built-in session hooks.
    pub fn with_defaults() -> Self {
        let mut bus = Self::new();
        bus.subscribe(HookEvent::StartupOnce, "autostart", autostart::<R>);
        bus.subscribe(HookEvent::FocusChange, "raise_floating", raise_floating::<R>);
        bus.subscribe(HookEvent::ClientManaged, "auto_show_screen", auto_show_screen::<R>);
        bus
    }

    /// Append `hook` to the callbacks of `event`.
    pub fn subscribe<F>(&mut self, event: HookEvent, name: &str, hook: F)
    where
        F: FnMut(&HookContext<'_, R>, Option<&WindowInfo>) -> Result<(), HookError> + 'static,
    {
        self.hooks
            .entry(event)
            .or_default()
            .push((name.to_string(), Box::new(hook)));
    }

    /// Number of callbacks registered for `event`.
    pub fn count(&self, event: HookEvent) -> usize {
        self.hooks.get(&event).map_or(0, Vec::len)
    }

    /// Run every callback of `event` in order.
    ///
    /// Returns the number of callbacks that failed or panicked.
    pub fn emit(
        &mut self,
        event: HookEvent,
        ctx: &HookContext<'_, R>,
        window: Option<&WindowInfo>,
    ) -> usize {
        let Some(hooks) = self.hooks.get_mut(&event) else {
            return 0;
        };
        let mut failures = 0;
        for (name, hook) in hooks.iter_mut() {
            debug!("{}: running {}", event, name);
            match catch_unwind(AssertUnwindSafe(|| hook(ctx, window))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("{} hook {} failed: {}", event, name, e);
                    failures += 1;
                }
                Err(_) => {
                    error!("{} hook {} panicked", event, name);
                    failures += 1;
                }
            }
        }
        failures
    }
}

/// Launch the descriptor's autostart list in order.
///
/// Every entry is attempted even if earlier ones fail.
pub fn autostart<R: Runtime>(
    ctx: &HookContext<'_, R>,
    _window: Option<&WindowInfo>,
) -> Result<(), HookError> {
    let total = ctx.descriptor.autostart.len();
    let mut failed = 0;
    for request in &ctx.descriptor.autostart {
        match ctx.runtime.spawn(request) {
            Ok(()) => info!("autostart: {}", request),
            Err(e) => {
                warn!("autostart: {}: {}", request, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(HookError::Spawn { failed, total });
    }
    Ok(())
}

/// Raise every floating window of the active group above the tiled ones.
pub fn raise_floating<R: Runtime>(
    ctx: &HookContext<'_, R>,
    _window: Option<&WindowInfo>,
) -> Result<(), HookError> {
    let Some(current) = ctx.runtime.current_group().map_err(runtime_err)? else {
        return Ok(());
    };
    let windows = ctx.runtime.windows().map_err(runtime_err)?;
    for w in windows
        .iter()
        .filter(|w| w.floating && w.group.as_deref() == Some(current.as_str()))
    {
        debug!("raising floating window {} ({})", w.address, w.class);
        ctx.runtime
            .execute(&RuntimeCommand::RaiseWindow(w.address.clone()))
            .map_err(runtime_err)?;
    }
    Ok(())
}

/// Show a managed window's group on the focused screen unless some screen
/// already displays it.
pub fn auto_show_screen<R: Runtime>(
    ctx: &HookContext<'_, R>,
    window: Option<&WindowInfo>,
) -> Result<(), HookError> {
    let Some(group) = window.and_then(|w| w.group.as_deref()) else {
        return Ok(());
    };
    let screens = ctx.runtime.screens().map_err(runtime_err)?;
    if screens.iter().any(|s| s.group.as_deref() == Some(group)) {
        return Ok(());
    }
    info!("group {} is hidden, showing it on the focused screen", group);
    ctx.runtime
        .execute(&RuntimeCommand::ToGroup(group.to_string()))
        .map_err(runtime_err)
}
