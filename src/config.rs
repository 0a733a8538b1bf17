//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/tilesession/config.json`.
//! Every field is optional: a minimal `{}` file is valid and each section
//! falls back to compiled-in defaults, which together describe a complete
//! session (nine groups, a Max/Bsp layout pair, a two-screen bar, media keys
//! and an autostart list).
//!
//! # Example
//!
//! ```json
//! {
//!   "modifier": "mod4",
//!   "terminal": "alacritty",
//!   "keys": [
//!     { "keys": "mod+j", "action": { "Layout": "Left" } },
//!     { "keys": "mod+f", "action": { "Spawn": "librewolf" } }
//!   ],
//!   "groups": [
//!     { "name": "1" },
//!     { "name": "9", "layout": "bsp", "matches": [{ "wm_class": ["Spotify", "discord"] }] }
//!   ],
//!   "layout_theme": { "margin": 10, "border_focus": "df5412" },
//!   "bar": { "size": 20, "screens": 2 }
//! }
//! ```

use crate::binding::{KeySpec, MouseAction, MouseSpec};
use crate::command::{Action, LayoutCommand, Modifier, RuntimeCommand, SpawnRequest};
use crate::group::{Group, MatchRule};
use crate::layout::{FloatingLayout, LayoutKind, LayoutTheme};
use crate::widget::{BarConfig, WidgetDefaults};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Main modifier, substituted for `mod` in chords.
    pub modifier: Modifier,
    /// Terminal emulator bound to `mod+shift+Return`.  Empty disables the
    /// binding.
    pub terminal: String,
    /// Key bindings, in priority order.
    pub keys: Vec<KeySpec>,
    /// Mouse bindings for floating windows.
    pub mouse: Vec<MouseSpec>,
    pub groups: Vec<Group>,
    /// Shared style for every tiled layout.
    pub layout_theme: LayoutTheme,
    /// Layout preference list; the first entry is the default layout.
    pub layouts: Vec<LayoutKind>,
    pub floating: FloatingLayout,
    pub widget_defaults: WidgetDefaults,
    pub bar: BarConfig,
    pub autostart: Autostart,
    pub session: SessionFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modifier: Modifier::Mod4,
            terminal: "kitty".into(),
            keys: default_keys(),
            mouse: default_mouse(),
            groups: default_groups(),
            layout_theme: LayoutTheme::default(),
            layouts: vec![LayoutKind::Max, LayoutKind::Bsp],
            floating: FloatingLayout::default(),
            widget_defaults: WidgetDefaults::default(),
            bar: BarConfig::default(),
            autostart: Autostart::default(),
            session: SessionFlags::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

/// Processes launched once, on the first session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autostart {
    /// Scripts run first, in order (autostart, output configuration).
    pub scripts: Vec<String>,
    /// Applications launched after the scripts.
    pub apps: Vec<SpawnRequest>,
}

impl Default for Autostart {
    fn default() -> Self {
        Self {
            scripts: vec![
                "~/.config/autostart.sh".into(),
                "~/.config/wlrrandr.sh".into(),
            ],
            apps: vec![SpawnRequest::new(["spotify"]), SpawnRequest::new(["discord"])],
        }
    }
}

impl Autostart {
    /// Every launch in order: scripts first, then applications.
    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.scripts
            .iter()
            .map(|s| SpawnRequest::new([s.as_str()]))
            .chain(self.apps.iter().cloned())
            .collect()
    }
}

/// How the runtime reacts when a window asks for activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusOnActivation {
    /// Focus if the window's group is visible, otherwise mark urgent.
    Smart,
    Focus,
    Urgent,
    Never,
}

/// Runtime behaviour switches passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFlags {
    pub follow_mouse_focus: bool,
    pub bring_front_click: bool,
    pub cursor_warp: bool,
    pub auto_fullscreen: bool,
    pub focus_on_window_activation: FocusOnActivation,
    pub reconfigure_screens: bool,
    pub auto_minimize: bool,
    /// Name reported to clients; `LG3D` keeps Java toolkits happy.
    pub wmname: String,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            follow_mouse_focus: true,
            bring_front_click: false,
            cursor_warp: false,
            auto_fullscreen: true,
            focus_on_window_activation: FocusOnActivation::Smart,
            reconfigure_screens: true,
            auto_minimize: true,
            wmname: "LG3D".into(),
        }
    }
}

fn layout(keys: &str, cmd: LayoutCommand) -> KeySpec {
    KeySpec::new(keys, RuntimeCommand::Layout(cmd))
}

fn spawn(keys: &str, command_line: &str) -> KeySpec {
    KeySpec::new(keys, Action::spawn(command_line))
}

/// Window navigation, layout control and application launchers.
pub fn default_keys() -> Vec<KeySpec> {
    use LayoutCommand::*;
    vec![
        layout("mod+j", Left),
        layout("mod+l", Right),
        layout("mod+k", Down),
        layout("mod+i", Up),
        layout("mod+shift+j", ShuffleLeft),
        layout("mod+shift+l", ShuffleRight),
        layout("mod+shift+k", ShuffleDown),
        layout("mod+shift+i", ShuffleUp),
        layout("mod+tab", Next),
        layout("mod+control+j", GrowLeft),
        layout("mod+control+l", GrowRight),
        layout("mod+control+k", GrowDown),
        layout("mod+control+i", GrowUp),
        layout("mod+n", Normalize),
        KeySpec::new("mod+space", RuntimeCommand::NextLayout),
        KeySpec::new("mod+shift+c", RuntimeCommand::KillWindow),
        KeySpec::new("mod+q", RuntimeCommand::ReloadConfig),
        KeySpec::new("mod+shift+q", RuntimeCommand::Shutdown),
        KeySpec::new("mod+t", RuntimeCommand::ToggleFloating),
        spawn("mod+f", "librewolf"),
        spawn("mod+shift+e", "emacsclient -c -a emacs"),
        spawn("mod+shift+p", "spotify"),
        spawn("mod+shift+d", "discord"),
        spawn("mod+p", "bash ~/.config/wal/dmen.sh"),
        spawn("mod+shift+t", "thunar"),
        spawn("mod+shift+delete", "slock"),
        spawn("mod+shift+s", "~/.config/scripts/screenshot.sh"),
        spawn("XF86AudioPlay", "playerctl -p spotify play-pause"),
        spawn("XF86AudioPrev", "playerctl -p spotify previous"),
        spawn("XF86AudioNext", "playerctl -p spotify next"),
    ]
}

/// Drag to move/resize floating windows, middle-click to raise.
pub fn default_mouse() -> Vec<MouseSpec> {
    vec![
        MouseSpec {
            buttons: "mod+Button1".into(),
            action: MouseAction::MoveFloating,
        },
        MouseSpec {
            buttons: "mod+Button3".into(),
            action: MouseAction::ResizeFloating,
        },
        MouseSpec {
            buttons: "mod+Button2".into(),
            action: MouseAction::BringToFront,
        },
    ]
}

/// Groups `1`..`9`; music and chat clients go to `9`, tiled as bsp.
pub fn default_groups() -> Vec<Group> {
    let mut groups: Vec<Group> = (1..=8).map(|i| Group::new(i.to_string())).collect();
    groups.push(
        Group::new("9")
            .with_layout(LayoutKind::Bsp)
            .with_match(MatchRule::class(["Spotify", "discord"])),
    );
    groups
}
