use std::{borrow::Borrow, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Year label of the terminal calendar entry. Its single turn is keyed by the
/// label alone instead of `"{year} {date}"`.
pub const FINALE_YEAR: &str = "Finale Underway";

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

name_newtype!(TurnKey);
name_newtype!(TemplateName);

impl TurnKey {
    pub fn for_turn(year: &str, date: &str) -> Self {
        if year == FINALE_YEAR {
            Self::new(year)
        } else {
            Self(format!("{year} {date}"))
        }
    }
}

impl TemplateName {
    /// Templates are stored with underscores in place of spaces.
    pub fn display_label(&self) -> String {
        self.0.replace('_', " ")
    }

    /// An empty name never selects a template.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sparse turn -> template mapping. Only explicitly assigned turns have keys.
/// Keys keep insertion order so a saved timeline reads back the way it was
/// written; equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentMap(IndexMap<TurnKey, TemplateName>);

impl AssignmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, turn: &str) -> Option<&TemplateName> {
        self.0.get(turn)
    }

    pub fn contains(&self, turn: &str) -> bool {
        self.0.contains_key(turn)
    }

    pub fn insert(&mut self, turn: TurnKey, template: TemplateName) -> Option<TemplateName> {
        self.0.insert(turn, template)
    }

    pub fn remove(&mut self, turn: &str) -> Option<TemplateName> {
        self.0.shift_remove(turn)
    }

    pub fn retain(&mut self, keep: impl FnMut(&TurnKey, &mut TemplateName) -> bool) {
        self.0.retain(keep)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TurnKey, &TemplateName)> {
        self.0.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut TemplateName> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AssignmentMap
where
    K: Into<TurnKey>,
    V: Into<TemplateName>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(turn, template)| (turn.into(), template.into()))
                .collect(),
        )
    }
}
