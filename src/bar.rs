//! Bar frames: what each screen's bar shows right now.
//!
//! The session draws nothing itself.  [`render_frames`] resolves every
//! widget of every active screen against the live runtime state and the
//! latest poll output, and the daemon prints the resulting [`BarFrame`]s as
//! JSON lines for a bar program to draw.

use crate::command::{ScreenInfo, WindowInfo};
use crate::descriptor::SessionDescriptor;
use crate::layout::LayoutKind;
use crate::widget::{render_clock, WidgetSpec};
use chrono::{DateTime, TimeZone};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// One cell of a group box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCell {
    pub name: String,
    /// Shown on some screen.
    pub visible: bool,
    /// Shown on this screen.
    pub current: bool,
    /// Holds at least one window.
    pub occupied: bool,
}

/// A rendered widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Layout { name: String },
    Groups { groups: Vec<GroupCell> },
    Window { title: String },
    Text { text: String },
    Clock { text: String },
    Tray,
}

/// The bar of one screen, ready to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarFrame {
    pub screen: usize,
    pub output: String,
    pub size: u32,
    pub font: String,
    pub fontsize: u32,
    pub padding: u32,
    pub segments: Vec<Segment>,
}

/// Everything a frame is rendered from.
pub struct BarState<'a> {
    pub descriptor: &'a SessionDescriptor,
    pub screens: &'a [ScreenInfo],
    pub windows: &'a [WindowInfo],
    pub focused_window: Option<&'a WindowInfo>,
    /// Layouts changed at runtime; other groups use their initial layout.
    pub layouts: &'a HashMap<String, LayoutKind>,
    pub poll_text: &'a HashMap<String, String>,
}

impl BarState<'_> {
    fn layout_of(&self, group: &str) -> LayoutKind {
        self.layouts
            .get(group)
            .copied()
            .unwrap_or_else(|| self.descriptor.initial_layout(group))
    }

    fn group_cells(&self, screen: &ScreenInfo) -> Vec<GroupCell> {
        self.descriptor
            .groups
            .iter()
            .map(|g| GroupCell {
                name: g.name.clone(),
                visible: self
                    .screens
                    .iter()
                    .any(|s| s.group.as_deref() == Some(g.name.as_str())),
                current: screen.group.as_deref() == Some(g.name.as_str()),
                occupied: self
                    .windows
                    .iter()
                    .any(|w| w.group.as_deref() == Some(g.name.as_str())),
            })
            .collect()
    }

    /// The focused window's title, on the screen showing its group.
    fn window_title(&self, widget: &WidgetSpec, screen: &ScreenInfo) -> String {
        match self.focused_window {
            Some(w) if w.group.is_some() && w.group == screen.group => {
                widget.window_title(&w.title).to_string()
            }
            _ => String::new(),
        }
    }

    fn render<Tz>(&self, widget: &WidgetSpec, screen: &ScreenInfo, now: &DateTime<Tz>) -> Segment
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match widget {
            WidgetSpec::CurrentLayout => Segment::Layout {
                name: screen
                    .group
                    .as_deref()
                    .map(|g| self.layout_of(g).to_string())
                    .unwrap_or_default(),
            },
            WidgetSpec::GroupBox => Segment::Groups {
                groups: self.group_cells(screen),
            },
            WidgetSpec::WindowName { .. } => Segment::Window {
                title: self.window_title(widget, screen),
            },
            WidgetSpec::PollText { command, .. } => Segment::Text {
                text: self.poll_text.get(command).cloned().unwrap_or_default(),
            },
            WidgetSpec::Clock { format } => Segment::Clock {
                text: render_clock(format, now).unwrap_or_else(|e| {
                    warn!("{}", e);
                    String::new()
                }),
            },
            WidgetSpec::Systray => Segment::Tray,
        }
    }
}

/// One frame per configured screen that has an output.
pub fn render_frames<Tz>(state: &BarState<'_>, now: &DateTime<Tz>) -> Vec<BarFrame>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let defaults = &state.descriptor.widget_defaults;
    state
        .descriptor
        .active_screens(state.screens.len())
        .iter()
        .filter_map(|config| {
            let screen = state.screens.get(config.index)?;
            Some(BarFrame {
                screen: config.index,
                output: screen.name.clone(),
                size: config.bar_size,
                font: defaults.font.clone(),
                fontsize: defaults.fontsize,
                padding: defaults.padding,
                segments: config
                    .widgets
                    .iter()
                    .map(|w| state.render(w, screen, now))
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::FixedOffset;

    fn screens() -> Vec<ScreenInfo> {
        vec![
            ScreenInfo {
                index: 0,
                name: "DP-1".into(),
                group: Some("1".into()),
                focused: true,
            },
            ScreenInfo {
                index: 1,
                name: "HDMI-A-1".into(),
                group: Some("9".into()),
                focused: false,
            },
        ]
    }

    fn window(address: &str, title: &str, group: &str) -> WindowInfo {
        WindowInfo {
            address: address.into(),
            class: "kitty".into(),
            title: title.into(),
            group: Some(group.into()),
            ..WindowInfo::default()
        }
    }

    fn noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 5, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn primary_screen_renders_every_widget() {
        let (d, _) = SessionDescriptor::build(&Config::default());
        let screens = screens();
        let windows = vec![window("0x1", "notes.md - nvim", "1")];
        let mut poll_text = HashMap::new();
        poll_text.insert("sh ~/.config/scripts/bar.sh".to_string(), "cpu 3%".to_string());
        let state = BarState {
            descriptor: &d,
            screens: &screens,
            windows: &windows,
            focused_window: windows.first(),
            layouts: &HashMap::new(),
            poll_text: &poll_text,
        };

        let frames = render_frames(&state, &noon());
        assert_eq!(frames.len(), 2);
        let primary = &frames[0];
        assert_eq!(primary.output, "DP-1");
        assert_eq!(primary.size, 20);
        assert_eq!(primary.font, "Iosevka");
        assert_eq!(primary.segments[0], Segment::Layout { name: "max".into() });
        assert_eq!(primary.segments[2], Segment::Window { title: "nvim".into() });
        assert_eq!(primary.segments[3], Segment::Text { text: "cpu 3%".into() });
        assert_eq!(
            primary.segments[4],
            Segment::Clock {
                text: "Tue 03/05 12:00:00 PM".into()
            }
        );
        assert_eq!(primary.segments[5], Segment::Tray);
    }

    #[test]
    fn secondary_screen_has_its_own_layout_and_no_title() {
        let (d, _) = SessionDescriptor::build(&Config::default());
        let screens = screens();
        let windows = vec![window("0x1", "htop", "1")];
        let state = BarState {
            descriptor: &d,
            screens: &screens,
            windows: &windows,
            focused_window: windows.first(),
            layouts: &HashMap::new(),
            poll_text: &HashMap::new(),
        };
        let frames = render_frames(&state, &noon());
        let secondary = &frames[1];
        assert_eq!(secondary.segments.len(), 5);
        assert_eq!(secondary.segments[0], Segment::Layout { name: "bsp".into() });
        assert_eq!(secondary.segments[2], Segment::Window { title: String::new() });
        assert!(!secondary.segments.contains(&Segment::Tray));
    }

    #[test]
    fn group_box_marks_visible_current_and_occupied() {
        let (d, _) = SessionDescriptor::build(&Config::default());
        let screens = screens();
        let windows = vec![window("0x1", "htop", "4")];
        let state = BarState {
            descriptor: &d,
            screens: &screens,
            windows: &windows,
            focused_window: None,
            layouts: &HashMap::new(),
            poll_text: &HashMap::new(),
        };
        let frames = render_frames(&state, &noon());
        let Segment::Groups { groups } = &frames[1].segments[1] else {
            panic!("expected a group box");
        };
        let cell = |name: &str| groups.iter().find(|g| g.name == name).unwrap();
        assert!(cell("1").visible && !cell("1").current);
        assert!(cell("9").visible && cell("9").current);
        assert!(cell("4").occupied && !cell("4").visible);
        assert!(!cell("2").occupied);
    }

    #[test]
    fn runtime_layout_changes_show_up() {
        let (d, _) = SessionDescriptor::build(&Config::default());
        let screens = screens();
        let mut layouts = HashMap::new();
        layouts.insert("1".to_string(), LayoutKind::Bsp);
        let state = BarState {
            descriptor: &d,
            screens: &screens,
            windows: &[],
            focused_window: None,
            layouts: &layouts,
            poll_text: &HashMap::new(),
        };
        let frames = render_frames(&state, &noon());
        assert_eq!(frames[0].segments[0], Segment::Layout { name: "bsp".into() });
    }

    #[test]
    fn screens_without_output_get_no_frame() {
        let (d, _) = SessionDescriptor::build(&Config::default());
        let mut screens = screens();
        screens.truncate(1);
        let state = BarState {
            descriptor: &d,
            screens: &screens,
            windows: &[],
            focused_window: None,
            layouts: &HashMap::new(),
            poll_text: &HashMap::new(),
        };
        assert_eq!(render_frames(&state, &noon()).len(), 1);
    }

    #[test]
    fn frame_serializes_for_bar_programs() {
        let frame = BarFrame {
            screen: 0,
            output: "DP-1".into(),
            size: 20,
            font: "Iosevka".into(),
            fontsize: 15,
            padding: 3,
            segments: vec![Segment::Text { text: "hi".into() }, Segment::Tray],
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["segments"][0]["kind"], "text");
        assert_eq!(json["segments"][0]["text"], "hi");
        assert_eq!(json["segments"][1]["kind"], "tray");
    }
}
