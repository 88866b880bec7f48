use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CharacterCatalog;
use crate::composition::resolve_composition;
use crate::distribution::Distribution;
use crate::modifier::{ModifierEngine, Selection};
use crate::script::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    Distribution,
    Requires,
    MutuallyExclusive,
    AtLeastOneOf,
    NoScript,
    NotInScript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    pub related_character_ids: Vec<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>, related: Vec<String>) -> Self {
        ValidationIssue {
            kind,
            message: message.into(),
            related_character_ids: related,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub is_valid: bool,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let is_valid = issues.is_empty();
        ValidationResult { issues, is_valid }
    }

    /// Issue messages in order, as shown to the storyteller.
    pub fn details(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }
}

/// Distribution a complete selection must match: base table, then the
/// script's composition row, then the deltas of every active `adjustCounts`.
pub fn expected_distribution(
    script: &Script,
    catalog: &CharacterCatalog,
    player_count: u32,
    selected: &[String],
) -> Distribution {
    let base = Distribution::base_setup(player_count);
    let target = resolve_composition(script.composition.as_ref(), player_count, base).distribution;
    let delta = ModifierEngine::new(script, catalog).active_delta(selected);
    target.adjusted(&delta)
}

/// Check a storyteller's completed selection against the script.
///
/// `requires`, `mutuallyExclusive` and `atLeastOneOf` never change the
/// expected totals; only `adjustCounts` does.
pub fn validate(
    script: Option<&Script>,
    catalog: &CharacterCatalog,
    player_count: u32,
    selection: &[String],
) -> ValidationResult {
    let Some(script) = script else {
        return ValidationResult::from_issues(vec![ValidationIssue::new(
            IssueKind::NoScript,
            "No script is selected for this game",
            Vec::new(),
        )]);
    };

    let selected = Selection::from_ids(selection.iter().cloned()).into_ids();
    let mut issues = Vec::new();

    for id in selected.iter().filter(|id| !script.in_pool(id)) {
        issues.push(ValidationIssue::new(
            IssueKind::NotInScript,
            format!("{} is not part of script '{}'", id, script.id),
            vec![id.clone()],
        ));
    }

    let expected = expected_distribution(script, catalog, player_count, &selected);
    debug!(script = %script.id, player_count, %expected, "validating selection");
    issues.extend(ModifierEngine::new(script, catalog).evaluate(&selected, expected));

    ValidationResult::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Character, Team};
    use crate::distribution::CountDelta;
    use crate::script::ModifierRule;

    fn catalog() -> CharacterCatalog {
        CharacterCatalog::new(vec![
            Character::new("a1", Team::Townsfolk),
            Character::new("a2", Team::Townsfolk),
            Character::new("a3", Team::Townsfolk),
            Character::new("b1", Team::Outsider),
            Character::new("b2", Team::Outsider),
            Character::new("b3", Team::Outsider),
            Character::new("c1", Team::Minion),
            Character::new("x1", Team::Minion),
            Character::new("d1", Team::Demon),
        ])
        .unwrap()
    }

    fn script(modifiers: Vec<ModifierRule>) -> Script {
        Script {
            id: "test".to_string(),
            name: None,
            character_pool: ["a1", "a2", "a3", "b1", "b2", "b3", "c1", "x1", "d1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            composition: None,
            modifiers,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_script_is_single_issue() {
        let result = validate(None, &catalog(), 6, &ids(&["a1"]));
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::NoScript);
    }

    #[test]
    fn test_consistent_selection_is_valid() {
        let script = script(vec![ModifierRule::Requires {
            when_character: "c1".to_string(),
            require_characters: ids(&["b1"]),
        }]);
        let result = validate(
            Some(&script),
            &catalog(),
            6,
            &ids(&["a1", "a2", "a3", "b1", "c1", "d1"]),
        );
        assert_eq!(result.issues, vec![]);
        assert!(result.is_valid);
    }

    #[test]
    fn test_missing_required_character_names_trigger_and_target() {
        let script = script(vec![ModifierRule::Requires {
            when_character: "c1".to_string(),
            require_characters: ids(&["b1"]),
        }]);
        let result = validate(
            Some(&script),
            &catalog(),
            6,
            &ids(&["a1", "a2", "a3", "b2", "c1", "d1"]),
        );
        let requires: Vec<&ValidationIssue> = result
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::Requires)
            .collect();

        assert_eq!(requires.len(), 1);
        assert_eq!(requires[0].related_character_ids, ids(&["c1", "b1"]));
        assert!(requires[0].message.contains("c1"));
        assert!(requires[0].message.contains("b1"));
    }

    #[test]
    fn test_adjust_counts_shifts_expected_distribution() {
        let script = script(vec![ModifierRule::AdjustCounts {
            when_character: "x1".to_string(),
            delta: CountDelta {
                townsfolk: -2,
                outsiders: 2,
                ..CountDelta::default()
            },
        }]);
        let catalog = catalog();

        let with_baron = validate(
            Some(&script),
            &catalog,
            6,
            &ids(&["a1", "b1", "b2", "b3", "x1", "d1"]),
        );
        assert!(with_baron.is_valid, "{:?}", with_baron.issues);

        let unadjusted = validate(
            Some(&script),
            &catalog,
            6,
            &ids(&["a1", "a2", "a3", "b1", "x1", "d1"]),
        );
        assert_eq!(
            unadjusted.details(),
            vec![
                "Expected 1 townsfolk but found 3".to_string(),
                "Expected 3 outsiders but found 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_foreign_id_is_reported() {
        let result = validate(
            Some(&script(vec![])),
            &catalog(),
            6,
            &ids(&["a1", "a2", "a3", "b1", "c1", "d1", "zz"]),
        );
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::NotInScript);
    }

    #[test]
    fn test_result_json_shape() {
        let result = ValidationResult::from_issues(vec![ValidationIssue::new(
            IssueKind::AtLeastOneOf,
            "At least one of a1 must be in play",
            ids(&["a1"]),
        )]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["issues"][0]["kind"], "atLeastOneOf");
        assert_eq!(json["issues"][0]["relatedCharacterIds"][0], "a1");
    }
}
