//! Groups (named workspaces) and the rules that place windows into them.
//!
//! A [`GroupSet`] is an ordered list of [`Group`]s.  When a window is
//! managed, [`GroupSet::classify`] walks the groups in order and returns the
//! first one whose [`MatchRule`]s accept the window.  Rules never fail: a
//! rule that names no fields simply matches nothing.

use crate::command::WindowInfo;
use crate::layout::LayoutKind;
use serde::{Deserialize, Serialize};

/// A predicate over window metadata.
///
/// Every present field must accept the window; each field is a set of exact
/// values.  A rule with no fields (or an empty value set) never matches.
///
/// # Example
///
/// ```json
/// { "wm_class": ["Spotify", "discord"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wm_class: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wm_type: Option<Vec<String>>,
}

impl MatchRule {
    /// Match any of the given window classes.
    pub fn class<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            wm_class: Some(classes.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Match any of the given titles.
    pub fn title<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: Some(titles.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Match any of the given window type hints.
    pub fn wm_type<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            wm_type: Some(types.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Whether the rule names no fields at all.
    pub fn is_empty(&self) -> bool {
        self.wm_class.is_none() && self.title.is_none() && self.wm_type.is_none()
    }

    /// Evaluate the rule against `window`.
    pub fn matches(&self, window: &WindowInfo) -> bool {
        if self.is_empty() {
            return false;
        }
        let accepts = |values: &Option<Vec<String>>, field: Option<&str>| match values {
            None => true,
            Some(values) => field.is_some_and(|f| values.iter().any(|v| v == f)),
        };
        accepts(&self.wm_class, Some(window.class.as_str()))
            && accepts(&self.title, Some(window.title.as_str()))
            && accepts(&self.wm_type, window.wm_type.as_deref())
    }
}

/// One named workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Layout to start this group in, overriding the first preferred layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutKind>,
    /// Windows matching any of these rules are placed here automatically.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchRule>,
}

impl Group {
    /// A plain group with no layout override and no rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: None,
            matches: Vec::new(),
        }
    }

    pub fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_match(mut self, rule: MatchRule) -> Self {
        self.matches.push(rule);
        self
    }

    /// Whether any of this group's rules accept `window`.
    pub fn accepts(&self, window: &WindowInfo) -> bool {
        self.matches.iter().any(|r| r.matches(window))
    }
}

/// Ordered collection of groups with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupSet {
    groups: Vec<Group>,
}

impl GroupSet {
    /// Build a set, dropping later groups whose name was already taken.
    ///
    /// Returns the set together with the names that were dropped.
    pub fn new(groups: impl IntoIterator<Item = Group>) -> (Self, Vec<String>) {
        let mut kept: Vec<Group> = Vec::new();
        let mut duplicates = Vec::new();
        for group in groups {
            if kept.iter().any(|g| g.name == group.name) {
                duplicates.push(group.name);
            } else {
                kept.push(group);
            }
        }
        (Self { groups: kept }, duplicates)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn as_slice(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Return the first group whose rules accept `window`.
    pub fn classify(&self, window: &WindowInfo) -> Option<&Group> {
        self.groups.iter().find(|g| g.accepts(window))
    }
}
