//! Commands and types used throughout tilesession.
//!
//! This module defines the vocabulary that all components share:
//! [`Chord`] names a key trigger, [`Action`] describes what a binding does,
//! [`RuntimeCommand`] is the closed set of requests sent to the window
//! manager, and [`WindowInfo`] / [`ScreenInfo`] carry the read-only metadata
//! the runtime exposes.
//!
//! Chords are written as `+`-separated tokens with the key last, e.g.
//! `"mod4+shift+j"`.  The token `mod` stands for the configured main
//! modifier.

use crate::layout::LayoutKind;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A keyboard modifier, using X11 naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Shift,
    Lock,
    Control,
    Mod1,
    Mod2,
    Mod3,
    Mod4,
    Mod5,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Shift => write!(f, "shift"),
            Modifier::Lock => write!(f, "lock"),
            Modifier::Control => write!(f, "control"),
            Modifier::Mod1 => write!(f, "mod1"),
            Modifier::Mod2 => write!(f, "mod2"),
            Modifier::Mod3 => write!(f, "mod3"),
            Modifier::Mod4 => write!(f, "mod4"),
            Modifier::Mod5 => write!(f, "mod5"),
        }
    }
}

/// Parse a modifier name (case-insensitive; accepts common aliases such as
/// `"super"`, `"alt"` and `"ctrl"`).
fn parse_modifier(s: &str) -> Option<Modifier> {
    match s.trim().to_lowercase().as_str() {
        "shift" => Some(Modifier::Shift),
        "lock" | "caps" => Some(Modifier::Lock),
        "control" | "ctrl" => Some(Modifier::Control),
        "mod1" | "alt" => Some(Modifier::Mod1),
        "mod2" => Some(Modifier::Mod2),
        "mod3" => Some(Modifier::Mod3),
        "mod4" | "super" | "win" | "logo" => Some(Modifier::Mod4),
        "mod5" => Some(Modifier::Mod5),
        _ => None,
    }
}

impl FromStr for Modifier {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_modifier(s).ok_or_else(|| ChordError(format!("unknown modifier {:?}", s)))
    }
}

impl Serialize for Modifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Modifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_modifier(&s).ok_or_else(|| DeError::custom(format!("invalid modifier: {:?}", s)))
    }
}

/// Error produced when a chord string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chord: {0}")]
pub struct ChordError(String);

/// A modifier set plus one key symbol, treated as a single trigger.
///
/// Key symbols are stored lowercased so `"Return"` and `"return"` name the
/// same key.  The same type describes mouse chords, whose key symbol is a
/// button name such as `"button1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    modifiers: BTreeSet<Modifier>,
    key: String,
}

impl Chord {
    /// Build a chord from explicit parts.
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: &str) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key: key.trim().to_lowercase(),
        }
    }

    /// Parse `"mod+shift+j"`-style text, substituting `main` for the `mod`
    /// token.
    pub fn parse(spec: &str, main: Modifier) -> Result<Self, ChordError> {
        let tokens: Vec<&str> = spec.split('+').map(str::trim).collect();
        let (key, mods) = match tokens.split_last() {
            Some((key, mods)) if !key.is_empty() => (*key, mods),
            _ => return Err(ChordError(format!("missing key in {:?}", spec))),
        };
        let mut modifiers = BTreeSet::new();
        for token in mods {
            if token.eq_ignore_ascii_case("mod") {
                modifiers.insert(main);
            } else {
                modifiers.insert(token.parse()?);
            }
        }
        Ok(Self {
            modifiers,
            key: key.to_lowercase(),
        })
    }

    pub fn modifiers(&self) -> &BTreeSet<Modifier> {
        &self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m)?;
        }
        write!(f, "{}", self.key)
    }
}

/// Chords are written out in canonical form.  There is no `Deserialize`:
/// reading one back needs the main modifier, see [`Chord::parse`].
impl Serialize for Chord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Layout navigation commands, forwarded to whatever layout is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutCommand {
    Left,
    Right,
    Up,
    Down,
    ShuffleLeft,
    ShuffleRight,
    ShuffleUp,
    ShuffleDown,
    GrowLeft,
    GrowRight,
    GrowUp,
    GrowDown,
    Next,
    Normalize,
}

impl fmt::Display for LayoutCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayoutCommand::Left => "left",
            LayoutCommand::Right => "right",
            LayoutCommand::Up => "up",
            LayoutCommand::Down => "down",
            LayoutCommand::ShuffleLeft => "shuffle_left",
            LayoutCommand::ShuffleRight => "shuffle_right",
            LayoutCommand::ShuffleUp => "shuffle_up",
            LayoutCommand::ShuffleDown => "shuffle_down",
            LayoutCommand::GrowLeft => "grow_left",
            LayoutCommand::GrowRight => "grow_right",
            LayoutCommand::GrowUp => "grow_up",
            LayoutCommand::GrowDown => "grow_down",
            LayoutCommand::Next => "next",
            LayoutCommand::Normalize => "normalize",
        };
        write!(f, "{}", name)
    }
}

/// Every request the session can send to the window-manager runtime.
///
/// Commands that target "the focused window" carry no address; commands
/// issued by hooks name the window explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeCommand {
    /// Forward a navigation command to the active layout.
    Layout(LayoutCommand),
    /// Cycle to the next layout in the preference list.
    NextLayout,
    /// Switch the active group to the given layout.
    SetLayout(LayoutKind),
    /// Close the focused window.
    KillWindow,
    /// Toggle the focused window between tiled and floating.
    ToggleFloating,
    /// Raise the focused window to the top of the stacking order.
    BringToFront,
    /// Raise the window at the given address.
    RaiseWindow(String),
    /// Make the window at the given address float.
    FloatWindow(String),
    /// Show the named group on the currently focused screen.
    ToGroup(String),
    /// Move the focused window into the named group.
    WindowToGroup(String),
    /// Move a specific window into the named group without following it.
    MoveWindowToGroup { window: String, group: String },
    /// Ask the runtime to re-read its own configuration.
    ReloadConfig,
    /// End the session.
    Shutdown,
    /// A runtime-only command resolved by name at call time.
    Runtime {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeCommand::Layout(cmd) => write!(f, "layout.{}", cmd),
            RuntimeCommand::NextLayout => write!(f, "next_layout"),
            RuntimeCommand::SetLayout(kind) => write!(f, "group.setlayout({})", kind),
            RuntimeCommand::KillWindow => write!(f, "window.kill"),
            RuntimeCommand::ToggleFloating => write!(f, "window.toggle_floating"),
            RuntimeCommand::BringToFront => write!(f, "window.bring_to_front"),
            RuntimeCommand::RaiseWindow(w) => write!(f, "window[{}].bring_to_front", w),
            RuntimeCommand::FloatWindow(w) => write!(f, "window[{}].enable_floating", w),
            RuntimeCommand::ToGroup(g) => write!(f, "group[{}].toscreen", g),
            RuntimeCommand::WindowToGroup(g) => write!(f, "window.togroup({})", g),
            RuntimeCommand::MoveWindowToGroup { window, group } => {
                write!(f, "window[{}].togroup({})", window, group)
            }
            RuntimeCommand::ReloadConfig => write!(f, "reload_config"),
            RuntimeCommand::Shutdown => write!(f, "shutdown"),
            RuntimeCommand::Runtime { name, args } if args.is_empty() => write!(f, "{}", name),
            RuntimeCommand::Runtime { name, args } => write!(f, "{}({})", name, args.join(", ")),
        }
    }
}

/// A request to launch an external process without waiting for it.
///
/// Deserializes from either an argument array (`["playerctl", "next"]`) or
/// a command-line string, which is split on whitespace
/// (`"playerctl -p spotify next"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnRequest {
    argv: Vec<String>,
}

impl SpawnRequest {
    /// Build a request from an explicit argument vector.
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace.
    pub fn parse(command_line: &str) -> Self {
        Self::new(command_line.split_whitespace())
    }

    /// The executable, or `None` for an empty request.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments following the executable.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for SpawnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

impl<'de> Deserialize<'de> for SpawnRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = SpawnRequest;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "command-line string or array of arguments")
            }
            fn visit_str<E>(self, s: &str) -> Result<SpawnRequest, E>
            where
                E: DeError,
            {
                Ok(SpawnRequest::parse(s))
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<SpawnRequest, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut argv = Vec::new();
                while let Some(arg) = seq.next_element::<String>()? {
                    argv.push(arg);
                }
                Ok(SpawnRequest { argv })
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// What a key binding does when its chord is pressed.
///
/// On the wire a spawn is `{"Spawn":"kitty"}`; every other action is the
/// plain [`RuntimeCommand`] encoding, e.g. `"KillWindow"` or
/// `{"Layout":"Left"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Launch an external process, fire-and-forget.
    Spawn(SpawnRequest),
    /// Invoke the runtime's command surface.
    #[serde(untagged)]
    Command(RuntimeCommand),
}

impl Action {
    /// Shorthand for a spawn parsed from a command line.
    pub fn spawn(command_line: &str) -> Self {
        Action::Spawn(SpawnRequest::parse(command_line))
    }

    /// Group name this action targets, if it is a group switch or move.
    pub fn group(&self) -> Option<&str> {
        match self {
            Action::Command(RuntimeCommand::ToGroup(g))
            | Action::Command(RuntimeCommand::WindowToGroup(g)) => Some(g),
            _ => None,
        }
    }
}

impl From<RuntimeCommand> for Action {
    fn from(cmd: RuntimeCommand) -> Self {
        Action::Command(cmd)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Spawn(req) => write!(f, "spawn({})", req),
            Action::Command(cmd) => write!(f, "{}", cmd),
        }
    }
}

/// Read-only metadata about a managed window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowInfo {
    /// Window manager address / id.
    pub address: String,
    /// Window class (`WM_CLASS` or app id).
    pub class: String,
    /// Human-readable title.
    pub title: String,
    /// Window type hint (`"dialog"`, `"utility"`, …), when known.
    pub wm_type: Option<String>,
    /// Whether the window is currently floating.
    pub floating: bool,
    /// Whether the window requests a fixed size (min size == max size).
    pub fixed_size: bool,
    /// Name of the group the window currently belongs to.
    pub group: Option<String>,
}

/// A physical output as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    /// Position in the runtime's output order (0-based).
    pub index: usize,
    /// Output name (e.g. `"DP-1"`).
    pub name: String,
    /// Group currently displayed on this screen.
    pub group: Option<String>,
    /// Whether this screen has focus.
    pub focused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chord_with_main_modifier() {
        let c = Chord::parse("mod+shift+J", Modifier::Mod4).unwrap();
        assert_eq!(c, Chord::new([Modifier::Shift, Modifier::Mod4], "j"));
        assert_eq!(c.to_string(), "shift+mod4+j");
    }

    #[test]
    fn parse_chord_aliases() {
        let c = Chord::parse("super+ctrl+Return", Modifier::Mod4).unwrap();
        assert_eq!(c, Chord::new([Modifier::Mod4, Modifier::Control], "return"));
        let alt = Chord::parse("mod+1", Modifier::Mod1).unwrap();
        assert_eq!(alt.modifiers().iter().copied().collect::<Vec<_>>(), vec![Modifier::Mod1]);
        assert_eq!(alt.key(), "1");
    }

    #[test]
    fn parse_chord_without_modifiers() {
        let c = Chord::parse("XF86AudioPlay", Modifier::Mod4).unwrap();
        assert!(c.modifiers().is_empty());
        assert_eq!(c.key(), "xf86audioplay");
    }

    #[test]
    fn parse_chord_rejects_bad_input() {
        assert!(Chord::parse("mod4+", Modifier::Mod4).is_err());
        assert!(Chord::parse("hyper+j", Modifier::Mod4).is_err());
        assert!(Chord::parse("", Modifier::Mod4).is_err());
    }

    #[test]
    fn modifier_order_is_irrelevant() {
        let a = Chord::parse("shift+mod4+j", Modifier::Mod1).unwrap();
        let b = Chord::parse("mod4+shift+j", Modifier::Mod1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn spawn_request_from_string_and_array() {
        let a: SpawnRequest = serde_json::from_str(r#""playerctl -p spotify next""#).unwrap();
        let b: SpawnRequest = serde_json::from_str(r#"["playerctl", "-p", "spotify", "next"]"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.program(), Some("playerctl"));
        assert_eq!(a.args().len(), 3);
    }

    #[test]
    fn empty_spawn_request_has_no_program() {
        let req = SpawnRequest::parse("   ");
        assert_eq!(req.program(), None);
        assert!(req.args().is_empty());
    }

    #[test]
    fn action_wire_format() {
        let spawn: Action = serde_json::from_str(r#"{"Spawn":"kitty"}"#).unwrap();
        assert_eq!(spawn, Action::spawn("kitty"));

        let kill: Action = serde_json::from_str(r#""KillWindow""#).unwrap();
        assert_eq!(kill, Action::Command(RuntimeCommand::KillWindow));

        let left: Action = serde_json::from_str(r#"{"Layout":"Left"}"#).unwrap();
        assert_eq!(left, Action::Command(RuntimeCommand::Layout(LayoutCommand::Left)));

        let named: Action =
            serde_json::from_str(r#"{"Runtime":{"name":"spawncmd"}}"#).unwrap();
        assert_eq!(
            named,
            Action::Command(RuntimeCommand::Runtime {
                name: "spawncmd".into(),
                args: vec![]
            })
        );
    }

    #[test]
    fn action_group_target() {
        assert_eq!(Action::from(RuntimeCommand::ToGroup("3".into())).group(), Some("3"));
        assert_eq!(Action::from(RuntimeCommand::WindowToGroup("9".into())).group(), Some("9"));
        assert_eq!(Action::spawn("kitty").group(), None);
    }

    #[test]
    fn window_info_defaults_missing_fields() {
        let w: WindowInfo = serde_json::from_str(r#"{"address":"0x1","class":"kitty"}"#).unwrap();
        assert_eq!(w.class, "kitty");
        assert!(!w.floating);
        assert_eq!(w.group, None);
    }

    #[test]
    fn command_display() {
        assert_eq!(RuntimeCommand::Layout(LayoutCommand::GrowUp).to_string(), "layout.grow_up");
        assert_eq!(RuntimeCommand::ToGroup("2".into()).to_string(), "group[2].toscreen");
        assert_eq!(
            RuntimeCommand::SetLayout(LayoutKind::MonadTall).to_string(),
            "group.setlayout(monadtall)"
        );
        assert_eq!(
            RuntimeCommand::Runtime { name: "foo".into(), args: vec!["a".into(), "b".into()] }
                .to_string(),
            "foo(a, b)"
        );
    }
}
