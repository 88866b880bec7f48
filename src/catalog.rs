use serde::{Deserialize, Serialize};

use crate::error::{SetupError, SetupResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Townsfolk,
    Outsider,
    Minion,
    Demon,
}

impl Team {
    pub const ALL: [Team; 4] = [Team::Townsfolk, Team::Outsider, Team::Minion, Team::Demon];

    pub fn from_str_or_shorthand(s: &str) -> Option<Team> {
        match s.to_lowercase().as_str() {
            "townsfolk" | "tf" => Some(Team::Townsfolk),
            "outsider" | "outsiders" | "os" => Some(Team::Outsider),
            "minion" | "minions" | "mn" => Some(Team::Minion),
            "demon" | "demons" | "dm" => Some(Team::Demon),
            _ => None,
        }
    }

    /// Plural label used in audit notes and issue messages.
    pub fn label(&self) -> &'static str {
        match self {
            Team::Townsfolk => "townsfolk",
            Team::Outsider => "outsiders",
            Team::Minion => "minions",
            Team::Demon => "demons",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub team: Team,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
}

impl Character {
    pub fn new(id: impl Into<String>, team: Team) -> Self {
        Character {
            id: id.into(),
            team,
            name: None,
            ability: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Read-only id -> character lookup.
///
/// Characters are kept in load order; catalogs hold a few dozen entries so a
/// linear scan is all the lookup needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterCatalog {
    characters: Vec<Character>,
}

impl CharacterCatalog {
    pub fn new(characters: Vec<Character>) -> SetupResult<Self> {
        for (idx, character) in characters.iter().enumerate() {
            if character.id.trim().is_empty() {
                return Err(SetupError::InvalidData(format!(
                    "character #{} has an empty id",
                    idx
                )));
            }
            if characters[..idx].iter().any(|c| c.id == character.id) {
                return Err(SetupError::InvalidData(format!(
                    "duplicate character id '{}'",
                    character.id
                )));
            }
        }
        Ok(CharacterCatalog { characters })
    }

    // Compiled-in data, checked by the builtin library tests instead.
    pub(crate) fn from_trusted(characters: Vec<Character>) -> Self {
        CharacterCatalog { characters }
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn team_of(&self, id: &str) -> Option<Team> {
        self.get(id).map(|c| c.team)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_shorthands() {
        assert_eq!(Team::from_str_or_shorthand("TF"), Some(Team::Townsfolk));
        assert_eq!(Team::from_str_or_shorthand("outsiders"), Some(Team::Outsider));
        assert_eq!(Team::from_str_or_shorthand("mn"), Some(Team::Minion));
        assert_eq!(Team::from_str_or_shorthand("Demon"), Some(Team::Demon));
        assert_eq!(Team::from_str_or_shorthand("traveller"), None);
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let result = CharacterCatalog::new(vec![
            Character::new("chef", Team::Townsfolk),
            Character::new("chef", Team::Outsider),
        ]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("duplicate character id 'chef'"));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = CharacterCatalog::new(vec![
            Character::new("chef", Team::Townsfolk),
            Character::new("imp", Team::Demon),
        ])
        .unwrap();

        assert_eq!(catalog.team_of("imp"), Some(Team::Demon));
        assert_eq!(catalog.team_of("baron"), None);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_character_json_shape() {
        let character: Character =
            serde_json::from_str(r#"{"id": "drunk", "team": "outsider"}"#).unwrap();
        assert_eq!(character.team, Team::Outsider);
        assert_eq!(character.display_name(), "drunk");

        let json = serde_json::to_string(&character).unwrap();
        assert_eq!(json, r#"{"id":"drunk","team":"outsider"}"#);
    }
}
