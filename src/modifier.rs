//! Modifier rules, applied two ways.
//!
//! Fill mode mutates a working [`Selection`] toward a target and records what
//! it did as audit notes. Validate mode leaves the selection alone and reports
//! every violated rule as a [`ValidationIssue`]. Neither mode fails: a rule
//! that names unknown characters or cannot be satisfied only produces a note.

use tracing::debug;

use crate::catalog::{CharacterCatalog, Team};
use crate::distribution::{CountDelta, Distribution};
use crate::script::{ModifierRule, Script};
use crate::validate::{IssueKind, ValidationIssue};

/// Ordered, duplicate-free working selection plus the ids rule resolution
/// added and must keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
    protected: Vec<String>,
}

impl Selection {
    /// Build from caller input, keeping the first occurrence of each id.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Selection::default();
        for id in ids {
            selection.insert(id.into());
        }
        selection
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn is_protected(&self, id: &str) -> bool {
        self.protected.iter().any(|s| s == id)
    }

    /// Append `id` unless it is already selected. Returns whether it was added.
    pub fn insert(&mut self, id: String) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    fn insert_protected(&mut self, id: String) -> bool {
        if !self.insert(id.clone()) {
            return false;
        }
        self.protected.push(id);
        true
    }

    /// Mark an already-selected id as kept. Returns false if it is absent.
    pub fn protect(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        if !self.is_protected(id) {
            self.protected.push(id.to_string());
        }
        true
    }

    fn remove(&mut self, id: &str) {
        self.ids.retain(|s| s != id);
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

pub struct ModifierEngine<'a> {
    script: &'a Script,
    catalog: &'a CharacterCatalog,
}

impl<'a> ModifierEngine<'a> {
    pub fn new(script: &'a Script, catalog: &'a CharacterCatalog) -> Self {
        ModifierEngine { script, catalog }
    }

    fn team_of(&self, id: &str) -> Option<Team> {
        self.catalog.team_of(id)
    }

    fn tally(&self, selection: &Selection) -> Distribution {
        Distribution::tally(self.catalog, selection.ids())
    }

    /// Would adding `id` put two members of a `mutuallyExclusive` rule in play?
    fn conflicts_with(&self, id: &str, selection: &Selection) -> bool {
        self.script.modifiers.iter().any(|rule| match rule {
            ModifierRule::MutuallyExclusive { characters } => {
                characters.iter().any(|c| c == id)
                    && characters.iter().any(|c| c != id && selection.contains(c))
            }
            _ => false,
        })
    }

    /// Is `id` a `requires` trigger whose requirements are not all selected?
    fn has_unmet_requirements(&self, id: &str, selection: &Selection) -> bool {
        self.script.modifiers.iter().any(|rule| match rule {
            ModifierRule::Requires {
                when_character,
                require_characters,
            } => when_character == id && require_characters.iter().any(|r| !selection.contains(r)),
            _ => false,
        })
    }

    fn protect_requirements(&self, id: &str, selection: &mut Selection) {
        for rule in &self.script.modifiers {
            if let ModifierRule::Requires {
                when_character,
                require_characters,
            } = rule
            {
                if when_character == id {
                    for required in require_characters {
                        selection.protect(required);
                    }
                }
            }
        }
    }

    fn is_adjust_trigger(&self, id: &str) -> bool {
        self.script.modifiers.iter().any(|rule| {
            matches!(rule, ModifierRule::AdjustCounts { when_character, .. } if when_character == id)
        })
    }

    /// Summed deltas of every `adjustCounts` rule whose trigger is selected.
    pub fn active_delta(&self, selected: &[String]) -> CountDelta {
        let mut total = CountDelta::default();
        for rule in &self.script.modifiers {
            if let ModifierRule::AdjustCounts {
                when_character,
                delta,
            } = rule
            {
                if selected.iter().any(|s| s == when_character) {
                    total.add(delta);
                }
            }
        }
        total
    }

    /// Top up each team to `target` from unselected pool members, in pool
    /// order. Surplus manual picks are left in place.
    pub fn seed(&self, selection: &mut Selection, target: Distribution, audit: &mut Vec<String>) {
        let mut have = self.tally(selection);

        for id in &self.script.character_pool {
            if selection.contains(id) {
                continue;
            }
            let Some(team) = self.team_of(id) else {
                continue;
            };
            if have.get(team) < target.get(team) {
                selection.insert(id.clone());
                have.set(team, have.get(team) + 1);
            }
        }

        for team in Team::ALL {
            let (got, want) = (have.get(team), target.get(team));
            if got < want {
                debug!(team = team.label(), got, want, "pool exhausted while seeding");
                audit.push(format!(
                    "pool exhausted for {}: filled {} of {}",
                    team.label(),
                    got,
                    want
                ));
            } else if got > want {
                audit.push(format!(
                    "{} already over target ({} selected, {} expected); manual picks kept",
                    team.label(),
                    got,
                    want
                ));
            }
        }
    }

    /// Apply every rule to `selection` in the fixed fill order:
    /// mutuallyExclusive, requires, atLeastOneOf, adjustCounts.
    pub fn fill(&self, selection: &mut Selection, audit: &mut Vec<String>) {
        self.fill_mutually_exclusive(selection, audit);
        self.fill_requires(selection, audit);
        self.fill_at_least_one_of(selection, audit);
        self.fill_adjust_counts(selection, audit);
    }

    fn fill_mutually_exclusive(&self, selection: &mut Selection, audit: &mut Vec<String>) {
        for rule in &self.script.modifiers {
            let ModifierRule::MutuallyExclusive { characters } = rule else {
                continue;
            };
            loop {
                let mut present: Vec<&String> = Vec::new();
                for c in characters {
                    if selection.contains(c) && !present.contains(&c) {
                        present.push(c);
                    }
                }
                if present.len() <= 1 {
                    break;
                }
                let victim = present[present.len() - 1].clone();
                let kept = present[0];
                audit.push(format!(
                    "mutuallyExclusive: removed {} (conflicts with {})",
                    victim, kept
                ));
                selection.remove(&victim);
            }
        }
    }

    // Repeats until nothing changes so a required character that is itself
    // a trigger pulls in its own requirements.
    fn fill_requires(&self, selection: &mut Selection, audit: &mut Vec<String>) {
        let mut reported_missing: Vec<(&str, &str)> = Vec::new();
        loop {
            let mut added = false;
            for rule in &self.script.modifiers {
                let ModifierRule::Requires {
                    when_character,
                    require_characters,
                } = rule
                else {
                    continue;
                };
                if !selection.contains(when_character) {
                    continue;
                }
                for required in require_characters {
                    if selection.contains(required) {
                        selection.protect(required);
                        continue;
                    }
                    if !self.script.in_pool(required) {
                        let key = (when_character.as_str(), required.as_str());
                        if !reported_missing.contains(&key) {
                            reported_missing.push(key);
                            audit.push(format!(
                                "requires: {} (required by {}) is not in the script pool",
                                required, when_character
                            ));
                        }
                        continue;
                    }
                    selection.insert_protected(required.clone());
                    audit.push(format!(
                        "requires: added {} (required by {})",
                        required, when_character
                    ));
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
    }

    fn fill_at_least_one_of(&self, selection: &mut Selection, audit: &mut Vec<String>) {
        for rule in &self.script.modifiers {
            let ModifierRule::AtLeastOneOf { characters } = rule else {
                continue;
            };
            if let Some(present) = characters.iter().find(|c| selection.contains(c)) {
                selection.protect(present);
                continue;
            }
            let candidate = self.script.character_pool.iter().find(|id| {
                characters.contains(id)
                    && !selection.contains(id)
                    && !self.conflicts_with(id, selection)
            });
            match candidate {
                Some(id) => {
                    selection.insert_protected(id.clone());
                    audit.push(format!(
                        "atLeastOneOf: added {} (none of {} selected)",
                        id,
                        characters.join(", ")
                    ));
                }
                None => {
                    debug!(candidates = %characters.join(", "), "atLeastOneOf has no pool candidate");
                }
            }
        }
    }

    fn fill_adjust_counts(&self, selection: &mut Selection, audit: &mut Vec<String>) {
        let delta = self.active_delta(selection.ids());
        if delta.is_zero() {
            return;
        }

        let triggers: Vec<&String> = self
            .script
            .modifiers
            .iter()
            .filter_map(|rule| match rule {
                ModifierRule::AdjustCounts {
                    when_character,
                    delta,
                } if selection.contains(when_character) => {
                    audit.push(format!("adjustCounts: {} applies {}", when_character, delta));
                    Some(when_character)
                }
                _ => None,
            })
            .collect();

        let current = self.tally(selection);
        let target = current.adjusted(&delta);

        for team in Team::ALL {
            let mut have = current.get(team);
            let want = target.get(team);

            if have < want {
                // One at a time: each addition can rule out a later candidate
                // through a mutuallyExclusive rule.
                for id in &self.script.character_pool {
                    if have >= want {
                        break;
                    }
                    if selection.contains(id)
                        || self.team_of(id) != Some(team)
                        || self.is_adjust_trigger(id)
                        || self.conflicts_with(id, selection)
                        || self.has_unmet_requirements(id, selection)
                    {
                        continue;
                    }
                    audit.push(format!("adjustCounts: added {} ({})", id, team.label()));
                    selection.insert(id.clone());
                    self.protect_requirements(id, selection);
                    have += 1;
                }
                if have < want {
                    audit.push(format!(
                        "adjustCounts: {} short by {}, no addable candidates",
                        team.label(),
                        want - have
                    ));
                }
            }

            if have > want {
                // Scan from the end so the most recently added picks go first.
                let removals: Vec<String> = selection
                    .ids()
                    .iter()
                    .rev()
                    .filter(|id| {
                        self.team_of(id) == Some(team)
                            && !selection.is_protected(id)
                            && !triggers.contains(id)
                    })
                    .take((have - want) as usize)
                    .cloned()
                    .collect();
                for id in removals {
                    audit.push(format!("adjustCounts: removed {} ({})", id, team.label()));
                    selection.remove(&id);
                    have -= 1;
                }
                if have > want {
                    audit.push(format!(
                        "adjustCounts: {} over by {}, no removable candidates",
                        team.label(),
                        have - want
                    ));
                }
            }
        }
    }

    /// Validate mode: report every distribution mismatch and rule violation
    /// for a fixed selection.
    pub fn evaluate(&self, selected: &[String], expected: Distribution) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let is_selected = |id: &str| selected.iter().any(|s| s == id);

        let actual = Distribution::tally(self.catalog, selected);
        for team in Team::ALL {
            let (found, want) = (actual.get(team), expected.get(team));
            if found == want {
                continue;
            }
            let related: Vec<String> = selected
                .iter()
                .filter(|id| self.team_of(id) == Some(team))
                .cloned()
                .collect();
            issues.push(ValidationIssue::new(
                IssueKind::Distribution,
                format!("Expected {} {} but found {}", want, team.label(), found),
                related,
            ));
        }

        for rule in &self.script.modifiers {
            match rule {
                ModifierRule::Requires {
                    when_character,
                    require_characters,
                } if is_selected(when_character.as_str()) => {
                    for required in require_characters.iter().filter(|r| !is_selected(r.as_str())) {
                        issues.push(ValidationIssue::new(
                            IssueKind::Requires,
                            format!("{} requires {}, which is not selected", when_character, required),
                            vec![when_character.clone(), required.clone()],
                        ));
                    }
                }
                ModifierRule::MutuallyExclusive { characters } => {
                    let present: Vec<String> =
                        characters.iter().filter(|c| is_selected(c.as_str())).cloned().collect();
                    if present.len() > 1 {
                        issues.push(ValidationIssue::new(
                            IssueKind::MutuallyExclusive,
                            format!(
                                "Only one of {} may be in play, found {}",
                                characters.join(", "),
                                present.join(", ")
                            ),
                            present,
                        ));
                    }
                }
                ModifierRule::AtLeastOneOf { characters } => {
                    if !characters.iter().any(|c| is_selected(c.as_str())) {
                        issues.push(ValidationIssue::new(
                            IssueKind::AtLeastOneOf,
                            format!("At least one of {} must be in play", characters.join(", ")),
                            characters.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        issues
    }
}
