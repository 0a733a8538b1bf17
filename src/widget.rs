//! Status-bar widgets and per-screen bar assembly.
//!
//! Every screen's bar is derived from one shared base list.  Widgets marked
//! primary-only (the system tray) appear on the primary screen and are left
//! out everywhere else, so the secondary bars are the base list minus those
//! slots.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Return the part of a window title after the last `"— "` or `"-"`
/// separator, trimmed.
///
/// Titles without a separator are returned trimmed.  An em-dash only
/// separates when a space follows it.  When the trailing segment is blank
/// (`"vim -"`) the last non-blank segment is used instead.
///
/// ```
/// use tilesession::widget::shorten_title;
/// assert_eq!(shorten_title("Mozilla Firefox — GitHub"), "GitHub");
/// assert_eq!(shorten_title("htop"), "htop");
/// ```
pub fn shorten_title(title: &str) -> &str {
    let mut rest = title;
    loop {
        let cut = [
            rest.rfind("— ").map(|i| (i, "— ".len())),
            rest.rfind('-').map(|i| (i, 1)),
        ]
        .into_iter()
        .flatten()
        .max_by_key(|&(i, _)| i);
        let Some((at, len)) = cut else {
            return rest.trim();
        };
        let segment = rest[at + len..].trim();
        if !segment.is_empty() {
            return segment;
        }
        rest = &rest[..at];
    }
}

/// Font settings shared by every widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetDefaults {
    pub font: String,
    pub fontsize: u32,
    pub padding: u32,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            font: "Iosevka".into(),
            fontsize: 15,
            padding: 3,
        }
    }
}

/// One status-bar element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidgetSpec {
    /// Name of the active layout.
    CurrentLayout,
    /// Clickable list of groups.
    GroupBox,
    /// Title of the focused window.
    WindowName {
        /// Pass the title through [`shorten_title`].
        #[serde(default)]
        shorten: bool,
    },
    /// Output of a shell command, refreshed periodically off the event loop.
    PollText {
        command: String,
        /// Seconds between runs; must be positive.
        update_interval: f64,
    },
    /// Local time in a strftime format.
    Clock { format: String },
    /// System tray.  Only one can exist per session, so it lives on the
    /// primary screen.
    Systray,
}

impl WidgetSpec {
    /// Widgets that must only appear on the primary screen.
    pub fn primary_only(&self) -> bool {
        matches!(self, WidgetSpec::Systray)
    }

    /// Text a window-name widget shows for `title`.
    pub fn window_title<'a>(&self, title: &'a str) -> &'a str {
        match self {
            WidgetSpec::WindowName { shorten: true } => shorten_title(title),
            _ => title,
        }
    }

    /// Polling period of a [`PollText`](WidgetSpec::PollText) widget.
    pub fn poll_interval(&self) -> Option<Result<Duration, WidgetError>> {
        match self {
            WidgetSpec::PollText {
                update_interval, ..
            } => Some(poll_interval(*update_interval)),
            _ => None,
        }
    }

    /// Check per-kind options.
    pub fn validate(&self) -> Result<(), WidgetError> {
        match self {
            WidgetSpec::PollText {
                update_interval, ..
            } => poll_interval(*update_interval).map(|_| ()),
            WidgetSpec::Clock { format } => validate_clock_format(format),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for WidgetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetSpec::CurrentLayout => write!(f, "current_layout"),
            WidgetSpec::GroupBox => write!(f, "group_box"),
            WidgetSpec::WindowName { .. } => write!(f, "window_name"),
            WidgetSpec::PollText { command, .. } => write!(f, "poll_text({})", command),
            WidgetSpec::Clock { .. } => write!(f, "clock"),
            WidgetSpec::Systray => write!(f, "systray"),
        }
    }
}

/// Invalid widget options.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WidgetError {
    #[error("poll interval {0} is not a positive number of seconds a timer can hold")]
    Interval(f64),
    #[error("invalid clock format {0:?}")]
    ClockFormat(String),
}

/// Intervals must be representable and must not round down to zero.
fn poll_interval(seconds: f64) -> Result<Duration, WidgetError> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(interval) if !interval.is_zero() => Ok(interval),
        _ => Err(WidgetError::Interval(seconds)),
    }
}

fn validate_clock_format(format: &str) -> Result<(), WidgetError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        Err(WidgetError::ClockFormat(format.to_string()))
    } else {
        Ok(())
    }
}

/// Render a clock widget's text at `now`.
pub fn render_clock<Tz>(format: &str, now: &DateTime<Tz>) -> Result<String, WidgetError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    validate_clock_format(format)?;
    Ok(now.format(format).to_string())
}

/// Bar layout shared by all screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Bar thickness in pixels.
    pub size: u32,
    /// Number of screens to describe.
    pub screens: usize,
    /// Index of the screen that receives primary-only widgets.
    pub primary: usize,
    /// Base widget list, left to right.
    pub widgets: Vec<WidgetSpec>,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            size: 20,
            screens: 2,
            primary: 0,
            widgets: vec![
                WidgetSpec::CurrentLayout,
                WidgetSpec::GroupBox,
                WidgetSpec::WindowName { shorten: true },
                WidgetSpec::PollText {
                    command: "sh ~/.config/scripts/bar.sh".into(),
                    update_interval: 1.0,
                },
                WidgetSpec::Clock {
                    format: "%a %m/%d %I:%M:%S %p".into(),
                },
                WidgetSpec::Systray,
            ],
        }
    }
}

/// The bar of one physical screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenConfig {
    pub index: usize,
    pub primary: bool,
    pub bar_size: u32,
    pub widgets: Vec<WidgetSpec>,
}

/// Widgets for one screen: the base list, minus primary-only widgets unless
/// `primary` is set.
pub fn screen_widgets(base: &[WidgetSpec], primary: bool) -> Vec<WidgetSpec> {
    base.iter()
        .filter(|w| primary || !w.primary_only())
        .cloned()
        .collect()
}

impl BarConfig {
    /// Build one [`ScreenConfig`] per configured screen.
    pub fn build_screens(&self) -> Vec<ScreenConfig> {
        (0..self.screens)
            .map(|index| {
                let primary = index == self.primary;
                ScreenConfig {
                    index,
                    primary,
                    bar_size: self.size,
                    widgets: screen_widgets(&self.widgets, primary),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn shorten_em_dash_title() {
        assert_eq!(shorten_title("Mozilla Firefox — GitHub"), "GitHub");
    }

    #[test]
    fn shorten_hyphen_title() {
        assert_eq!(shorten_title("README.md - Emacs"), "Emacs");
        assert_eq!(shorten_title("a-b-c"), "c");
    }

    #[test]
    fn shorten_without_separator() {
        assert_eq!(shorten_title("htop"), "htop");
        assert_eq!(shorten_title("  htop  "), "htop");
        assert_eq!(shorten_title(""), "");
    }

    #[test]
    fn shorten_trailing_separator_uses_last_content() {
        assert_eq!(shorten_title("vim -"), "vim");
        assert_eq!(shorten_title("Chat — "), "Chat");
    }

    #[test]
    fn shorten_em_dash_needs_trailing_space() {
        assert_eq!(shorten_title("Rock—Paper"), "Rock—Paper");
        assert_eq!(shorten_title("Rock—Paper — Scissors"), "Scissors");
        assert_eq!(shorten_title("Chat —"), "Chat —");
    }

    #[test]
    fn shorten_mixed_separators_uses_last() {
        assert_eq!(shorten_title("x-y — z"), "z");
        assert_eq!(shorten_title("x — y-z"), "z");
    }

    #[test]
    fn window_name_shortening_is_optional() {
        let short = WidgetSpec::WindowName { shorten: true };
        let full = WidgetSpec::WindowName { shorten: false };
        assert_eq!(short.window_title("Spotify - Song"), "Song");
        assert_eq!(full.window_title("Spotify - Song"), "Spotify - Song");
    }

    #[test]
    fn secondary_screen_drops_systray_slot() {
        let bar = BarConfig::default();
        let screens = bar.build_screens();
        assert_eq!(screens.len(), 2);

        let base = &bar.widgets;
        let tray_index = base.iter().position(|w| *w == WidgetSpec::Systray).unwrap();
        assert_eq!(tray_index, 5);

        assert!(screens[0].primary);
        assert_eq!(screens[0].widgets.len(), base.len());
        assert_eq!(&screens[0].widgets, base);

        assert!(!screens[1].primary);
        assert_eq!(screens[1].widgets.len(), base.len() - 1);
        let mut expected = base.clone();
        expected.remove(tray_index);
        assert_eq!(screens[1].widgets, expected);
    }

    #[test]
    fn primary_screen_can_be_moved() {
        let bar = BarConfig {
            primary: 1,
            ..BarConfig::default()
        };
        let screens = bar.build_screens();
        assert!(!screens[0].widgets.contains(&WidgetSpec::Systray));
        assert!(screens[1].widgets.contains(&WidgetSpec::Systray));
    }

    #[test]
    fn bar_size_carried_to_every_screen() {
        let screens = BarConfig::default().build_screens();
        assert!(screens.iter().all(|s| s.bar_size == 20));
    }

    #[test]
    fn poll_interval_must_be_positive() {
        let ok = WidgetSpec::PollText {
            command: "date".into(),
            update_interval: 0.5,
        };
        assert_eq!(ok.poll_interval(), Some(Ok(Duration::from_millis(500))));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e20, 1e-12] {
            let w = WidgetSpec::PollText {
                command: "date".into(),
                update_interval: bad,
            };
            assert!(w.validate().is_err());
        }
        assert_eq!(WidgetSpec::Systray.poll_interval(), None);
    }

    #[test]
    fn clock_format_is_validated() {
        assert!(WidgetSpec::Clock { format: "%a %m/%d %I:%M:%S %p".into() }.validate().is_ok());
        assert!(WidgetSpec::Clock { format: "%Q".into() }.validate().is_err());
    }

    #[test]
    fn render_default_clock() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let text = render_clock("%a %m/%d %I:%M:%S %p", &now).unwrap();
        assert_eq!(text, "Tue 03/05 02:07:09 PM");
    }

    #[test]
    fn deserialize_bar() {
        let json = r#"{
            "size": 24,
            "widgets": [
                "GroupBox",
                { "PollText": { "command": "date", "update_interval": 5 } },
                "Systray"
            ]
        }"#;
        let bar: BarConfig = serde_json::from_str(json).unwrap();
        assert_eq!(bar.size, 24);
        assert_eq!(bar.screens, 2);
        assert_eq!(bar.widgets.len(), 3);
    }
}
