//! Layout preferences and the floating layer.
//!
//! Layouts are selected by name; every listed layout shares one
//! [`LayoutTheme`].  The floating layer has its own border style and a list
//! of [`MatchRule`]s deciding which windows skip tiling.

use crate::command::WindowInfo;
use crate::group::MatchRule;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Layout algorithms known to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Max,
    Bsp,
    Columns,
    Stack,
    MonadTall,
    Floating,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutKind::Max => write!(f, "max"),
            LayoutKind::Bsp => write!(f, "bsp"),
            LayoutKind::Columns => write!(f, "columns"),
            LayoutKind::Stack => write!(f, "stack"),
            LayoutKind::MonadTall => write!(f, "monadtall"),
            LayoutKind::Floating => write!(f, "floating"),
        }
    }
}

/// An RGB color, stored normalised as `#rrggbb`.
///
/// Accepts `"df5412"` or `"#DF5412"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

/// Error produced for malformed color strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color: {0:?}")]
pub struct ColorError(String);

impl Color {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The color without its leading `#`.
    pub fn hex(&self) -> &str {
        &self.0[1..]
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Color(format!("#{}", hex.to_lowercase())))
        } else {
            Err(ColorError(s.to_string()))
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

/// Build a color from a literal known to be valid.
fn color(hex: &str) -> Color {
    Color(format!("#{}", hex))
}

/// Visual parameters applied uniformly to every tiled layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTheme {
    /// Gap around each window (pixels).
    pub margin: u32,
    pub border_focus: Color,
    pub border_normal: Color,
    /// Border of the focused window inside a stacked split.
    pub border_focus_stack: Color,
    pub border_width: u32,
}

impl Default for LayoutTheme {
    fn default() -> Self {
        Self {
            margin: 10,
            border_focus: color("df5412"),
            border_normal: color("0f0f0f"),
            border_focus_stack: color("df5714"),
            border_width: 4,
        }
    }
}

/// One entry of the layout preference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSpec {
    pub kind: LayoutKind,
    pub theme: LayoutTheme,
}

/// Attach `theme` to every layout in `kinds`, preserving order.
pub fn themed_layouts(kinds: &[LayoutKind], theme: &LayoutTheme) -> Vec<LayoutSpec> {
    kinds
        .iter()
        .map(|&kind| LayoutSpec {
            kind,
            theme: theme.clone(),
        })
        .collect()
}

/// Rules and style of the floating layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatingLayout {
    /// Prepend the runtime's stock rules (dialogs, splash screens, …).
    pub default_rules: bool,
    /// Float windows that request a fixed size.
    pub float_fixed_size: bool,
    /// Additional user rules.
    pub rules: Vec<MatchRule>,
    pub border_focus: Color,
    pub border_width: u32,
}

impl Default for FloatingLayout {
    fn default() -> Self {
        Self {
            default_rules: true,
            float_fixed_size: true,
            rules: vec![
                MatchRule::class(["confirmreset"]),
                MatchRule::class(["makebranch"]),
                MatchRule::class(["maketag"]),
                MatchRule::class(["ssh-askpass"]),
                MatchRule::title(["branchdialog"]),
                MatchRule::title(["pinentry"]),
                MatchRule::title(["SpeedCrunch"]),
                MatchRule::title(["Friends List"]),
                MatchRule::class(["pavucontrol"]),
            ],
            border_focus: color("3bae4b"),
            border_width: 4,
        }
    }
}

/// The runtime's stock floating rules.
pub fn default_float_rules() -> Vec<MatchRule> {
    vec![
        MatchRule::wm_type(["utility", "notification", "toolbar", "splash", "dialog"]),
        MatchRule::class([
            "file_progress",
            "confirm",
            "dialog",
            "download",
            "error",
            "notification",
            "splash",
            "toolbar",
        ]),
    ]
}

impl FloatingLayout {
    /// Whether `window` should bypass tiling.
    pub fn should_float(&self, window: &WindowInfo) -> bool {
        (self.float_fixed_size && window.fixed_size)
            || (self.default_rules && default_float_rules().iter().any(|r| r.matches(window)))
            || self.rules.iter().any(|r| r.matches(window))
    }
}
