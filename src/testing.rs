//! Shared test double for the [`Runtime`] trait.

use crate::command::{RuntimeCommand, ScreenInfo, SpawnRequest, WindowInfo};
use crate::descriptor::SessionDescriptor;
use crate::traits::Runtime;
use std::cell::{Cell, RefCell};

/// A runtime that records every call and simulates the few state changes the
/// session relies on (showing groups, moving and floating windows).
#[derive(Debug, Default)]
pub(crate) struct RecorderRuntime {
    pub screens: RefCell<Vec<ScreenInfo>>,
    pub windows: RefCell<Vec<WindowInfo>>,
    pub executed: RefCell<Vec<RuntimeCommand>>,
    pub spawned: RefCell<Vec<SpawnRequest>>,
    pub notifications: RefCell<Vec<String>>,
    /// Programs whose spawn fails.
    pub failing_programs: RefCell<Vec<String>>,
    /// Address of the focused window.
    pub focused: RefCell<Option<String>>,
    /// Number of descriptors pushed through [`Runtime::apply`].
    pub applied: Cell<usize>,
    /// Make `screens` and `windows` fail.
    pub fail_queries: Cell<bool>,
}

#[derive(Debug, thiserror::Error)]
#[error("recorder error: {0}")]
pub(crate) struct RecorderError(pub String);

impl RecorderRuntime {
    /// `DP-1` (focused, showing group `1`) and `HDMI-A-1` (showing `2`).
    pub fn two_screens() -> Self {
        let rt = Self::default();
        *rt.screens.borrow_mut() = vec![
            ScreenInfo {
                index: 0,
                name: "DP-1".into(),
                group: Some("1".into()),
                focused: true,
            },
            ScreenInfo {
                index: 1,
                name: "HDMI-A-1".into(),
                group: Some("2".into()),
                focused: false,
            },
        ];
        rt
    }

    pub fn add_window(&self, address: &str, class: &str, group: &str, floating: bool) {
        self.windows.borrow_mut().push(WindowInfo {
            address: address.into(),
            class: class.into(),
            title: class.into(),
            floating,
            group: Some(group.into()),
            ..WindowInfo::default()
        });
    }

    pub fn visible_groups(&self) -> Vec<String> {
        self.screens
            .borrow()
            .iter()
            .filter_map(|s| s.group.clone())
            .collect()
    }

    pub fn spawned_programs(&self) -> Vec<String> {
        self.spawned
            .borrow()
            .iter()
            .filter_map(|r| r.program().map(str::to_string))
            .collect()
    }
}

impl Runtime for RecorderRuntime {
    type Error = RecorderError;

    fn screens(&self) -> Result<Vec<ScreenInfo>, RecorderError> {
        if self.fail_queries.get() {
            return Err(RecorderError("screens unavailable".into()));
        }
        Ok(self.screens.borrow().clone())
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, RecorderError> {
        if self.fail_queries.get() {
            return Err(RecorderError("windows unavailable".into()));
        }
        Ok(self.windows.borrow().clone())
    }

    fn focused_window(&self) -> Result<Option<WindowInfo>, RecorderError> {
        let focused = self.focused.borrow();
        Ok(self
            .windows()?
            .into_iter()
            .find(|w| focused.as_deref() == Some(w.address.as_str())))
    }

    fn apply(&self, _descriptor: &SessionDescriptor) -> Result<(), RecorderError> {
        self.applied.set(self.applied.get() + 1);
        Ok(())
    }

    fn execute(&self, command: &RuntimeCommand) -> Result<(), RecorderError> {
        self.executed.borrow_mut().push(command.clone());
        match command {
            RuntimeCommand::ToGroup(group) => {
                let mut screens = self.screens.borrow_mut();
                let focused_group = screens.iter().find(|s| s.focused).and_then(|s| s.group.clone());
                // A group shown elsewhere swaps with the focused screen's group.
                for s in screens.iter_mut() {
                    if !s.focused && s.group.as_deref() == Some(group.as_str()) {
                        s.group = focused_group.clone();
                    }
                }
                if let Some(s) = screens.iter_mut().find(|s| s.focused) {
                    s.group = Some(group.clone());
                }
            }
            RuntimeCommand::MoveWindowToGroup { window, group } => {
                if let Some(w) = self.windows.borrow_mut().iter_mut().find(|w| &w.address == window) {
                    w.group = Some(group.clone());
                }
            }
            RuntimeCommand::FloatWindow(window) => {
                if let Some(w) = self.windows.borrow_mut().iter_mut().find(|w| &w.address == window) {
                    w.floating = true;
                }
            }
            RuntimeCommand::Runtime { name, .. } => {
                return Err(RecorderError(format!("unknown command {}", name)));
            }
            _ => {}
        }
        Ok(())
    }

    fn spawn(&self, request: &SpawnRequest) -> Result<(), RecorderError> {
        self.spawned.borrow_mut().push(request.clone());
        match request.program() {
            Some(p) if self.failing_programs.borrow().iter().any(|f| f == p) => {
                Err(RecorderError(format!("cannot start {}", p)))
            }
            _ => Ok(()),
        }
    }

    fn notify(&self, message: &str) -> Result<(), RecorderError> {
        self.notifications.borrow_mut().push(message.to_string());
        Ok(())
    }
}
