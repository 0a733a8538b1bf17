//! The binding table: key chords mapped to actions.
//!
//! The table is built once per descriptor load from the configured
//! [`KeySpec`]s plus two generated bindings per group (switch to the group,
//! move the focused window to it).  Lookups are exact: the pressed modifier
//! set must equal the binding's.

use crate::command::{Action, Chord, ChordError, Modifier, RuntimeCommand};
use crate::group::Group;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A key binding as written in the configuration.
///
/// `keys` uses the chord syntax of [`Chord::parse`], with `mod` standing for
/// the session's main modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySpec {
    pub keys: String,
    pub action: Action,
}

impl KeySpec {
    pub fn new(keys: &str, action: impl Into<Action>) -> Self {
        Self {
            keys: keys.into(),
            action: action.into(),
        }
    }
}

/// A resolved binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub chord: Chord,
    pub action: Action,
}

/// Problems found while building the table.  None of them are fatal; the
/// offending binding is skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("binding {keys:?}: {source}")]
    Chord {
        keys: String,
        #[source]
        source: ChordError,
    },
    #[error("chord {chord} is bound twice; keeping {kept}, ignoring {ignored}")]
    Duplicate {
        chord: Chord,
        kept: String,
        ignored: String,
    },
}

/// Exact-match map from [`Chord`] to [`Action`], in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: Vec<Binding>,
    #[serde(skip)]
    index: HashMap<Chord, usize>,
}

/// The two bindings every group receives: `mod+<name>` shows the group,
/// `mod+shift+<name>` moves the focused window there.
pub fn group_bindings(main: Modifier, group: &Group) -> [Binding; 2] {
    [
        Binding {
            chord: Chord::new([main], &group.name),
            action: RuntimeCommand::ToGroup(group.name.clone()).into(),
        },
        Binding {
            chord: Chord::new([main, Modifier::Shift], &group.name),
            action: RuntimeCommand::WindowToGroup(group.name.clone()).into(),
        },
    ]
}

impl BindingTable {
    /// Resolve `keys` and append the generated group bindings.
    ///
    /// Unparsable chords and duplicates are skipped; the first binding of a
    /// chord wins.  Every skipped entry is reported in the returned list.
    pub fn build(main: Modifier, keys: &[KeySpec], groups: &[Group]) -> (Self, Vec<BindingError>) {
        let mut table = Self::default();
        let mut errors = Vec::new();

        for spec in keys {
            match Chord::parse(&spec.keys, main) {
                Ok(chord) => {
                    if let Err(e) = table.insert(chord, spec.action.clone()) {
                        errors.push(e);
                    }
                }
                Err(source) => errors.push(BindingError::Chord {
                    keys: spec.keys.clone(),
                    source,
                }),
            }
        }

        for group in groups {
            for binding in group_bindings(main, group) {
                if let Err(e) = table.insert(binding.chord, binding.action) {
                    errors.push(e);
                }
            }
        }

        (table, errors)
    }

    fn insert(&mut self, chord: Chord, action: Action) -> Result<(), BindingError> {
        if let Some(&existing) = self.index.get(&chord) {
            return Err(BindingError::Duplicate {
                chord,
                kept: self.bindings[existing].action.to_string(),
                ignored: action.to_string(),
            });
        }
        self.index.insert(chord.clone(), self.bindings.len());
        self.bindings.push(Binding { chord, action });
        Ok(())
    }

    /// The action bound to exactly `chord`, if any.
    pub fn lookup(&self, chord: &Chord) -> Option<&Action> {
        self.index.get(chord).map(|&i| &self.bindings[i].action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Pointer actions on floating windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseAction {
    /// Drag to move a floating window.
    MoveFloating,
    /// Drag to resize a floating window.
    ResizeFloating,
    /// Click to raise the window.
    BringToFront,
}

impl MouseAction {
    /// Drags track pointer motion; clicks fire once.
    pub fn is_drag(&self) -> bool {
        matches!(self, MouseAction::MoveFloating | MouseAction::ResizeFloating)
    }
}

/// A mouse binding as written in the configuration (`"mod+button1"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseSpec {
    pub buttons: String,
    pub action: MouseAction,
}

/// A resolved mouse binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MouseBinding {
    pub chord: Chord,
    pub action: MouseAction,
}

/// Resolve mouse bindings, skipping unparsable chords.
pub fn build_mouse_bindings(main: Modifier, specs: &[MouseSpec]) -> (Vec<MouseBinding>, Vec<BindingError>) {
    let mut bindings = Vec::new();
    let mut errors = Vec::new();
    for spec in specs {
        match Chord::parse(&spec.buttons, main) {
            Ok(chord) => bindings.push(MouseBinding {
                chord,
                action: spec.action,
            }),
            Err(source) => errors.push(BindingError::Chord {
                keys: spec.buttons.clone(),
                source,
            }),
        }
    }
    (bindings, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LayoutCommand;

    fn groups() -> Vec<Group> {
        (1..=9).map(|i| Group::new(i.to_string())).collect()
    }

    fn chord(s: &str) -> Chord {
        Chord::parse(s, Modifier::Mod4).unwrap()
    }

    #[test]
    fn lookup_exact_match() {
        let keys = vec![
            KeySpec::new("mod+j", RuntimeCommand::Layout(LayoutCommand::Left)),
            KeySpec::new("mod+shift+j", RuntimeCommand::Layout(LayoutCommand::ShuffleLeft)),
        ];
        let (table, errors) = BindingTable::build(Modifier::Mod4, &keys, &[]);
        assert!(errors.is_empty());
        assert_eq!(
            table.lookup(&chord("mod4+j")),
            Some(&Action::Command(RuntimeCommand::Layout(LayoutCommand::Left)))
        );
        assert_eq!(
            table.lookup(&chord("mod4+shift+j")),
            Some(&Action::Command(RuntimeCommand::Layout(LayoutCommand::ShuffleLeft)))
        );
        // Extra modifiers do not fall back to a subset match.
        assert_eq!(table.lookup(&chord("mod4+control+shift+j")), None);
        assert_eq!(table.lookup(&chord("j")), None);
    }

    #[test]
    fn every_group_gets_two_bindings() {
        let groups = groups();
        let (table, errors) = BindingTable::build(Modifier::Mod4, &[], &groups);
        assert!(errors.is_empty());
        assert_eq!(table.len(), groups.len() * 2);
        for g in &groups {
            let referencing: Vec<&Binding> = table
                .iter()
                .filter(|b| b.action.group() == Some(g.name.as_str()))
                .collect();
            assert_eq!(referencing.len(), 2, "group {}", g.name);
            assert_eq!(
                table.lookup(&Chord::new([Modifier::Mod4], &g.name)),
                Some(&Action::Command(RuntimeCommand::ToGroup(g.name.clone())))
            );
            assert_eq!(
                table.lookup(&Chord::new([Modifier::Mod4, Modifier::Shift], &g.name)),
                Some(&Action::Command(RuntimeCommand::WindowToGroup(g.name.clone())))
            );
        }
    }

    #[test]
    fn group_chords_never_collide() {
        let groups = groups();
        let chords: Vec<Chord> = groups
            .iter()
            .flat_map(|g| group_bindings(Modifier::Mod4, g))
            .map(|b| b.chord)
            .collect();
        let unique: std::collections::HashSet<&Chord> = chords.iter().collect();
        assert_eq!(unique.len(), chords.len());
    }

    #[test]
    fn duplicate_chord_keeps_first() {
        let keys = vec![
            KeySpec::new("mod+f", Action::spawn("librewolf")),
            KeySpec::new("mod4+F", Action::spawn("firefox")),
        ];
        let (table, errors) = BindingTable::build(Modifier::Mod4, &keys, &[]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&chord("mod4+f")), Some(&Action::spawn("librewolf")));
        assert!(matches!(errors.as_slice(), [BindingError::Duplicate { .. }]));
    }

    #[test]
    fn user_binding_shadows_generated_group_binding() {
        let keys = vec![KeySpec::new("mod+1", Action::spawn("kitty"))];
        let groups = vec![Group::new("1")];
        let (table, errors) = BindingTable::build(Modifier::Mod4, &keys, &groups);
        assert_eq!(table.lookup(&chord("mod4+1")), Some(&Action::spawn("kitty")));
        assert_eq!(errors.len(), 1);
        // The move binding still exists.
        assert!(table.lookup(&chord("mod4+shift+1")).is_some());
    }

    #[test]
    fn invalid_chord_is_skipped() {
        let keys = vec![
            KeySpec::new("hyper+x", RuntimeCommand::KillWindow),
            KeySpec::new("mod+x", RuntimeCommand::KillWindow),
        ];
        let (table, errors) = BindingTable::build(Modifier::Mod4, &keys, &[]);
        assert_eq!(table.len(), 1);
        assert!(matches!(errors.as_slice(), [BindingError::Chord { .. }]));
    }

    #[test]
    fn main_modifier_is_configurable() {
        let keys = vec![KeySpec::new("mod+q", RuntimeCommand::ReloadConfig)];
        let (table, _) = BindingTable::build(Modifier::Mod1, &keys, &[Group::new("1")]);
        assert!(table.lookup(&chord("alt+q")).is_some());
        assert!(table.lookup(&chord("alt+1")).is_some());
        assert!(table.lookup(&chord("mod4+q")).is_none());
    }

    #[test]
    fn mouse_bindings_resolve() {
        let specs = vec![
            MouseSpec {
                buttons: "mod+Button1".into(),
                action: MouseAction::MoveFloating,
            },
            MouseSpec {
                buttons: "mod+".into(),
                action: MouseAction::BringToFront,
            },
        ];
        let (bindings, errors) = build_mouse_bindings(Modifier::Mod4, &specs);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].chord, chord("mod4+button1"));
        assert!(bindings[0].action.is_drag());
        assert_eq!(errors.len(), 1);
        assert!(!MouseAction::BringToFront.is_drag());
    }
}
