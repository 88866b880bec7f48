//! Script definitions as they are stored on disk.
//!
//! A script is a character pool plus two optional layers of rules: a
//! composition table that replaces the standard per-team counts, and an
//! ordered list of modifier rules. Every list here is order-significant.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::distribution::CountDelta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub character_pool: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
    #[serde(default)]
    pub modifiers: Vec<ModifierRule>,
}

impl Script {
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn in_pool(&self, id: &str) -> bool {
        self.character_pool.iter().any(|c| c == id)
    }

    /// Position of `id` in the pool, used for pool-order sorting.
    pub fn pool_index(&self, id: &str) -> Option<usize> {
        self.character_pool.iter().position(|c| c == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModifierRule {
    #[serde(rename_all = "camelCase")]
    Requires {
        when_character: String,
        require_characters: Vec<String>,
    },
    MutuallyExclusive {
        characters: Vec<String>,
    },
    AtLeastOneOf {
        characters: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    AdjustCounts {
        when_character: String,
        delta: CountDelta,
    },
}

impl ModifierRule {
    /// Every character id this rule mentions, in rule order.
    pub fn referenced_ids(&self) -> Vec<&str> {
        match self {
            ModifierRule::Requires {
                when_character,
                require_characters,
            } => std::iter::once(when_character.as_str())
                .chain(require_characters.iter().map(String::as_str))
                .collect(),
            ModifierRule::MutuallyExclusive { characters }
            | ModifierRule::AtLeastOneOf { characters } => {
                characters.iter().map(String::as_str).collect()
            }
            ModifierRule::AdjustCounts { when_character, .. } => vec![when_character.as_str()],
        }
    }
}

/// Per-team value in a composition row: a literal count or a formula string.
///
/// Anything else still loads; it is rejected per team when the row is
/// evaluated, so one bad cell cannot sink the whole script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Literal(i64),
    Float(f64),
    Formula(String),
    Other(serde_json::Value),
}

impl fmt::Display for CountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountValue::Literal(n) => write!(f, "{}", n),
            CountValue::Float(x) => write!(f, "{}", x),
            CountValue::Formula(s) => write!(f, "\"{}\"", s),
            CountValue::Other(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub townsfolk: Option<CountValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outsiders: Option<CountValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minions: Option<CountValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demons: Option<CountValue>,
}

/// Player-count keyed composition table.
///
/// Stored as a list so the JSON object's declaration order survives loading;
/// the first matching key wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub entries: Vec<(String, CompositionRow)>,
}

impl Composition {
    pub fn new(entries: Vec<(String, CompositionRow)>) -> Self {
        Composition { entries }
    }
}

impl Serialize for Composition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, row) in &self.entries {
            map.serialize_entry(key, row)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Composition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CompositionVisitor;

        impl<'de> Visitor<'de> for CompositionVisitor {
            type Value = Composition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from player-count keys to team counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Composition, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, row)) = access.next_entry::<String, CompositionRow>()? {
                    entries.push((key, row));
                }
                Ok(Composition { entries })
            }
        }

        deserializer.deserialize_map(CompositionVisitor)
    }
}
