//! The session descriptor: the immutable blueprint built from a [`Config`].
//!
//! A descriptor is built once at startup and rebuilt from scratch on every
//! reload.  Building never fails; problems in the configuration are
//! collected as [`DescriptorWarning`]s and the offending entries are left
//! out.

use crate::binding::{build_mouse_bindings, BindingError, BindingTable, KeySpec, MouseBinding};
use crate::command::{Action, Modifier, SpawnRequest};
use crate::config::{Config, SessionFlags};
use crate::group::GroupSet;
use crate::layout::{themed_layouts, FloatingLayout, LayoutKind, LayoutSpec};
use crate::widget::{BarConfig, ScreenConfig, WidgetDefaults, WidgetError, WidgetSpec};
use log::warn;
use serde::Serialize;
use std::time::Duration;

/// Chord bound to the configured terminal.
const TERMINAL_KEYS: &str = "mod+shift+Return";

/// A non-fatal problem found while building a descriptor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorWarning {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("group {0:?} is declared more than once; later declarations ignored")]
    DuplicateGroup(String),
    #[error("group {group:?} uses layout {layout} which is not in the layout list")]
    UnlistedGroupLayout { group: String, layout: LayoutKind },
    #[error("layout list is empty; using max")]
    NoLayouts,
    #[error("widget {widget} dropped: {source}")]
    Widget {
        widget: String,
        #[source]
        source: WidgetError,
    },
    #[error("primary screen {primary} is out of range ({screens} screens)")]
    PrimaryOutOfRange { primary: usize, screens: usize },
}

/// Everything the runtime needs to assemble a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
    pub modifier: Modifier,
    pub bindings: BindingTable,
    pub mouse: Vec<MouseBinding>,
    pub groups: GroupSet,
    pub layouts: Vec<LayoutSpec>,
    pub floating: FloatingLayout,
    pub widget_defaults: WidgetDefaults,
    pub screens: Vec<ScreenConfig>,
    /// Processes launched on the first start, in order.
    pub autostart: Vec<SpawnRequest>,
    pub flags: SessionFlags,
}

impl SessionDescriptor {
    /// Build a descriptor, returning it with every problem encountered.
    pub fn build(config: &Config) -> (Self, Vec<DescriptorWarning>) {
        let mut warnings = Vec::new();

        let (groups, duplicates) = GroupSet::new(config.groups.iter().cloned());
        warnings.extend(duplicates.into_iter().map(DescriptorWarning::DuplicateGroup));

        let mut keys = config.keys.clone();
        if !config.terminal.trim().is_empty() {
            keys.push(KeySpec::new(TERMINAL_KEYS, Action::spawn(&config.terminal)));
        }
        let (bindings, errors) = BindingTable::build(config.modifier, &keys, groups.as_slice());
        warnings.extend(errors.into_iter().map(DescriptorWarning::from));

        let (mouse, errors) = build_mouse_bindings(config.modifier, &config.mouse);
        warnings.extend(errors.into_iter().map(DescriptorWarning::from));

        let kinds = if config.layouts.is_empty() {
            warnings.push(DescriptorWarning::NoLayouts);
            vec![LayoutKind::Max]
        } else {
            config.layouts.clone()
        };
        for group in groups.iter() {
            if let Some(layout) = group.layout.filter(|l| !kinds.contains(l)) {
                warnings.push(DescriptorWarning::UnlistedGroupLayout {
                    group: group.name.clone(),
                    layout,
                });
            }
        }
        let layouts = themed_layouts(&kinds, &config.layout_theme);

        let screens = build_screens(&config.bar, &mut warnings);

        for w in &warnings {
            warn!("{}", w);
        }

        let descriptor = Self {
            modifier: config.modifier,
            bindings,
            mouse,
            groups,
            layouts,
            floating: config.floating.clone(),
            widget_defaults: config.widget_defaults.clone(),
            screens,
            autostart: config.autostart.requests(),
            flags: config.session.clone(),
        };
        (descriptor, warnings)
    }

    /// The layout a group starts in.
    pub fn initial_layout(&self, group: &str) -> LayoutKind {
        self.groups
            .get(group)
            .and_then(|g| g.layout)
            .or_else(|| self.layouts.first().map(|l| l.kind))
            .unwrap_or(LayoutKind::Max)
    }

    /// Screen configurations backed by one of `outputs` physical outputs.
    ///
    /// Screens beyond the available outputs stay inert.
    pub fn active_screens(&self, outputs: usize) -> &[ScreenConfig] {
        &self.screens[..outputs.min(self.screens.len())]
    }

    /// Distinct polled commands across `screens`, with their intervals.
    pub fn poll_widgets(screens: &[ScreenConfig]) -> Vec<(String, Duration)> {
        let mut polls: Vec<(String, Duration)> = Vec::new();
        for widget in screens.iter().flat_map(|s| &s.widgets) {
            if let (WidgetSpec::PollText { command, .. }, Some(Ok(interval))) =
                (widget, widget.poll_interval())
            {
                if !polls.iter().any(|(c, _)| c == command) {
                    polls.push((command.clone(), interval));
                }
            }
        }
        polls
    }
}

/// Drop invalid widgets from the base list, then assemble each screen.
fn build_screens(bar: &BarConfig, warnings: &mut Vec<DescriptorWarning>) -> Vec<ScreenConfig> {
    let widgets = bar
        .widgets
        .iter()
        .filter(|w| match w.validate() {
            Ok(()) => true,
            Err(source) => {
                warnings.push(DescriptorWarning::Widget {
                    widget: w.to_string(),
                    source,
                });
                false
            }
        })
        .cloned()
        .collect();
    if bar.primary >= bar.screens {
        warnings.push(DescriptorWarning::PrimaryOutOfRange {
            primary: bar.primary,
            screens: bar.screens,
        });
    }
    BarConfig {
        widgets,
        ..bar.clone()
    }
    .build_screens()
}
