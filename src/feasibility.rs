// SAT-based existence check for legal lineups.
//
// The greedy resolver only ever soft-fails, so it cannot tell a storyteller
// whether a shortfall was forced by the script or just an artifact of fill
// order. This module answers that exactly: one boolean per pool character,
// exact per-team cardinalities, and every modifier rule as clauses.
//
// Count-adjusting rules make the per-team targets depend on which triggers
// are present. Rather than encode conditional cardinalities, we enumerate
// trigger combinations and solve one unconditional instance per combination.

use rustsat::instances::{BasicVarManager, SatInstance};
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CharacterCatalog, Team};
use crate::composition::resolve_composition;
use crate::distribution::{CountDelta, Distribution};
use crate::error::{SetupError, SetupResult};
use crate::script::{ModifierRule, Script};

/// More distinct count-adjusting triggers than this is rejected rather than
/// enumerated.
pub const MAX_ADJUST_TRIGGERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityReport {
    pub feasible: bool,
    /// Witness lineup in pool order; empty when infeasible.
    pub lineup: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Distribution>,
    /// Count-adjusting triggers present in the witness.
    pub active_triggers: Vec<String>,
}

impl FeasibilityReport {
    fn infeasible() -> Self {
        FeasibilityReport {
            feasible: false,
            lineup: Vec::new(),
            counts: None,
            active_triggers: Vec::new(),
        }
    }
}

// Variable manager for one trigger combination
struct LineupVars {
    instance: SatInstance<BasicVarManager>,

    // present[i] - is candidate i in the lineup?
    present: Vec<(String, Team, Lit)>,
}

impl LineupVars {
    fn new(candidates: &[(String, Team)]) -> Self {
        let mut instance = SatInstance::new();
        let present = candidates
            .iter()
            .map(|(id, team)| (id.clone(), *team, instance.new_lit()))
            .collect();
        LineupVars { instance, present }
    }

    fn lit(&self, id: &str) -> Option<Lit> {
        self.present
            .iter()
            .find(|(candidate, _, _)| candidate == id)
            .map(|(_, _, lit)| *lit)
    }

    fn team_lits(&self, team: Team) -> Vec<Lit> {
        self.present
            .iter()
            .filter(|(_, t, _)| *t == team)
            .map(|(_, _, lit)| *lit)
            .collect()
    }

    fn add_contradiction(&mut self) {
        let false_lit = self.instance.new_lit();
        self.instance.add_unit(false_lit);
        self.instance.add_unit(!false_lit);
    }
}

/// Sequential counter: at most `k` of `lits` are true.
fn encode_at_most_k(instance: &mut SatInstance<BasicVarManager>, lits: &[Lit], k: usize) {
    let n = lits.len();
    if k >= n {
        return;
    }
    if k == 0 {
        for &lit in lits {
            instance.add_unit(!lit);
        }
        return;
    }

    // s[i][j] - at least j+1 of lits[0..=i] are true
    let s: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| instance.new_lit()).collect())
        .collect();

    instance.add_binary(!lits[0], s[0][0]);
    for j in 1..k {
        instance.add_unit(!s[0][j]);
    }

    for i in 1..n - 1 {
        instance.add_binary(!lits[i], s[i][0]);
        instance.add_binary(!s[i - 1][0], s[i][0]);
        for j in 1..k {
            instance.add_clause(
                vec![!lits[i], !s[i - 1][j - 1], s[i][j]]
                    .into_iter()
                    .collect(),
            );
            instance.add_binary(!s[i - 1][j], s[i][j]);
        }
        // overflow
        instance.add_binary(!lits[i], !s[i - 1][k - 1]);
    }

    instance.add_binary(!lits[n - 1], !s[n - 2][k - 1]);
}

/// Exactly `n` of `lits`: at-most-n over the literals plus at-most-(len-n)
/// over their negations.
fn encode_exactly_n(vars: &mut LineupVars, lits: &[Lit], n: usize) {
    if n > lits.len() {
        vars.add_contradiction();
        return;
    }
    encode_at_most_k(&mut vars.instance, lits, n);
    let negated: Vec<Lit> = lits.iter().map(|&lit| !lit).collect();
    encode_at_most_k(&mut vars.instance, &negated, lits.len() - n);
}

fn encode_rules(vars: &mut LineupVars, script: &Script) {
    for rule in &script.modifiers {
        match rule {
            ModifierRule::Requires {
                when_character,
                require_characters,
            } => {
                let Some(trigger) = vars.lit(when_character) else {
                    continue;
                };
                for required in require_characters {
                    match vars.lit(required) {
                        Some(lit) => vars.instance.add_binary(!trigger, lit),
                        // Required character can never appear, so neither can the trigger.
                        None => vars.instance.add_unit(!trigger),
                    }
                }
            }
            ModifierRule::MutuallyExclusive { characters } => {
                let lits: Vec<Lit> = characters.iter().filter_map(|c| vars.lit(c)).collect();
                for i in 0..lits.len() {
                    for j in i + 1..lits.len() {
                        vars.instance.add_binary(!lits[i], !lits[j]);
                    }
                }
            }
            ModifierRule::AtLeastOneOf { characters } => {
                let lits: Vec<Lit> = characters.iter().filter_map(|c| vars.lit(c)).collect();
                if lits.is_empty() {
                    vars.add_contradiction();
                } else {
                    let clause: Clause = lits.into_iter().collect();
                    vars.instance.add_clause(clause);
                }
            }
            // Handled by the trigger enumeration.
            ModifierRule::AdjustCounts { .. } => {}
        }
    }
}

/// Does any lineup exist that satisfies every rule exactly, contains all of
/// `must_include`, and matches the expected per-team counts?
pub fn check_feasibility(
    script: &Script,
    catalog: &CharacterCatalog,
    player_count: u32,
    must_include: &[String],
) -> SetupResult<FeasibilityReport> {
    // Pool characters the catalog cannot place on a team are never chosen.
    let candidates: Vec<(String, Team)> = script
        .character_pool
        .iter()
        .filter_map(|id| catalog.team_of(id).map(|team| (id.clone(), team)))
        .collect();
    let is_candidate = |id: &str| candidates.iter().any(|(c, _)| c == id);

    if let Some(missing) = must_include.iter().find(|id| !is_candidate(id.as_str())) {
        debug!(id = %missing, "required character cannot be placed");
        return Ok(FeasibilityReport::infeasible());
    }

    let mut triggers: Vec<&String> = Vec::new();
    for rule in &script.modifiers {
        if let ModifierRule::AdjustCounts { when_character, .. } = rule {
            if is_candidate(when_character.as_str()) && !triggers.contains(&when_character) {
                triggers.push(when_character);
            }
        }
    }
    if triggers.len() > MAX_ADJUST_TRIGGERS {
        return Err(SetupError::InvalidData(format!(
            "script '{}' has {} count-adjusting characters; at most {} can be checked",
            script.id,
            triggers.len(),
            MAX_ADJUST_TRIGGERS
        )));
    }

    let base = Distribution::base_setup(player_count);
    let target = resolve_composition(script.composition.as_ref(), player_count, base).distribution;

    for mask in 0u32..(1u32 << triggers.len()) {
        let active: Vec<&String> = triggers
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1u32 << *bit) != 0)
            .map(|(_, id)| *id)
            .collect();

        // A forced character that is a trigger rules out every mask without it.
        if triggers
            .iter()
            .any(|t| !active.contains(t) && must_include.contains(t))
        {
            continue;
        }

        let mut delta = CountDelta::default();
        for rule in &script.modifiers {
            if let ModifierRule::AdjustCounts {
                when_character,
                delta: rule_delta,
            } = rule
            {
                if active.contains(&when_character) {
                    delta.add(rule_delta);
                }
            }
        }
        let expected = target.adjusted(&delta);

        let mut vars = LineupVars::new(&candidates);
        for trigger in &triggers {
            if let Some(lit) = vars.lit(trigger) {
                if active.contains(trigger) {
                    vars.instance.add_unit(lit);
                } else {
                    vars.instance.add_unit(!lit);
                }
            }
        }
        for id in must_include {
            if let Some(lit) = vars.lit(id) {
                vars.instance.add_unit(lit);
            }
        }
        for team in Team::ALL {
            let lits = vars.team_lits(team);
            encode_exactly_n(&mut vars, &lits, expected.get(team) as usize);
        }
        encode_rules(&mut vars, script);

        debug!(
            mask,
            %expected,
            candidates = vars.present.len(),
            "solving lineup instance"
        );

        let present = vars.present;
        let mut solver = rustsat_minisat::core::Minisat::default();
        solver
            .add_cnf(vars.instance.into_cnf().0)
            .map_err(|e| SetupError::Solver(e.to_string()))?;

        match solver.solve().map_err(|e| SetupError::Solver(e.to_string()))? {
            SolverResult::Sat => {
                let mut lineup = Vec::new();
                for (id, _, lit) in &present {
                    let value = solver
                        .lit_val(*lit)
                        .map_err(|e| SetupError::Solver(e.to_string()))?;
                    if value == TernaryVal::True {
                        lineup.push(id.clone());
                    }
                }
                let counts = Distribution::tally(catalog, &lineup);
                return Ok(FeasibilityReport {
                    feasible: true,
                    lineup,
                    counts: Some(counts),
                    active_triggers: active.into_iter().cloned().collect(),
                });
            }
            SolverResult::Unsat => continue,
            SolverResult::Interrupted => {
                return Err(SetupError::Solver("solver was interrupted".to_string()));
            }
        }
    }

    Ok(FeasibilityReport::infeasible())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Character;
    use crate::repository::{ScriptLibrary, ScriptRepository};
    use crate::validate::validate;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

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
            Character::new("d2", Team::Demon),
        ])
        .unwrap()
    }

    fn script(pool: &[&str], modifiers: Vec<ModifierRule>) -> Script {
        Script {
            id: "sat".to_string(),
            name: None,
            character_pool: ids(pool),
            composition: None,
            modifiers,
        }
    }

    #[test]
    fn test_at_most_k_blocks_k_plus_one() {
        // 3 of 4 forced true with at-most-2 must be UNSAT
        let mut instance: SatInstance<BasicVarManager> = SatInstance::new();
        let lits: Vec<Lit> = (0..4).map(|_| instance.new_lit()).collect();
        encode_at_most_k(&mut instance, &lits, 2);
        for &lit in &lits[..3] {
            instance.add_unit(lit);
        }

        let mut solver = rustsat_minisat::core::Minisat::default();
        solver.add_cnf(instance.into_cnf().0).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
    }

    #[test]
    fn test_at_most_k_allows_exactly_k() {
        let mut instance: SatInstance<BasicVarManager> = SatInstance::new();
        let lits: Vec<Lit> = (0..4).map(|_| instance.new_lit()).collect();
        encode_at_most_k(&mut instance, &lits, 2);
        instance.add_unit(lits[1]);
        instance.add_unit(lits[3]);

        let mut solver = rustsat_minisat::core::Minisat::default();
        solver.add_cnf(instance.into_cnf().0).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    }

    #[test]
    fn test_builtin_script_is_feasible_for_standard_counts() {
        let library = ScriptLibrary::builtin();
        let script = library.script("trouble_brewing").unwrap();
        for players in 5..=15 {
            let report = check_feasibility(script, library.catalog(), players, &[]).unwrap();
            assert!(report.feasible, "{} players", players);
            let validation = validate(Some(script), library.catalog(), players, &report.lineup);
            assert!(validation.is_valid, "{} players: {:?}", players, validation.issues);
        }
    }

    #[test]
    fn test_forced_exclusive_pair_is_infeasible() {
        let script = script(
            &["a1", "a2", "a3", "b1", "c1", "d1"],
            vec![ModifierRule::MutuallyExclusive {
                characters: ids(&["a1", "a2"]),
            }],
        );
        let report = check_feasibility(&script, &catalog(), 6, &ids(&["a1", "a2"])).unwrap();
        assert!(!report.feasible);
        assert!(report.lineup.is_empty());
    }

    #[test]
    fn test_requires_pulls_in_target() {
        let script = script(
            &["a1", "a2", "a3", "b1", "b2", "c1", "d1"],
            vec![ModifierRule::Requires {
                when_character: "c1".to_string(),
                require_characters: ids(&["b2"]),
            }],
        );
        let report = check_feasibility(&script, &catalog(), 6, &ids(&["c1"])).unwrap();
        assert!(report.feasible);
        assert_eq!(report.lineup, ids(&["a1", "a2", "a3", "b2", "c1", "d1"]));
        assert_eq!(report.counts, Some(Distribution::new(3, 1, 1, 1)));
    }

    #[test]
    fn test_second_demon_requirement_is_infeasible() {
        let script = script(
            &["a1", "a2", "a3", "b1", "c1", "d1", "d2"],
            vec![ModifierRule::Requires {
                when_character: "c1".to_string(),
                require_characters: ids(&["d2"]),
            }],
        );
        let report = check_feasibility(&script, &catalog(), 6, &ids(&["c1", "d1"])).unwrap();
        assert!(!report.feasible);
    }

    #[test]
    fn test_at_least_one_of_without_candidates_is_infeasible() {
        let script = script(
            &["a1", "a2", "a3", "b1", "c1", "d1"],
            vec![ModifierRule::AtLeastOneOf {
                characters: ids(&["ghost"]),
            }],
        );
        let report = check_feasibility(&script, &catalog(), 6, &[]).unwrap();
        assert!(!report.feasible);
    }

    #[test]
    fn test_adjust_counts_trigger_makes_lineup_possible() {
        // one townsfolk in the pool: only the x1 adjustment (-2 tf, +2 os) fits
        let script = script(
            &["a1", "b1", "b2", "b3", "c1", "x1", "d1"],
            vec![ModifierRule::AdjustCounts {
                when_character: "x1".to_string(),
                delta: CountDelta {
                    townsfolk: -2,
                    outsiders: 2,
                    ..CountDelta::default()
                },
            }],
        );
        let report = check_feasibility(&script, &catalog(), 6, &[]).unwrap();

        assert!(report.feasible);
        assert_eq!(report.active_triggers, ids(&["x1"]));
        assert_eq!(report.lineup, ids(&["a1", "b1", "b2", "b3", "x1", "d1"]));
        assert_eq!(report.counts, Some(Distribution::new(1, 3, 1, 1)));
    }
}
