use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CharacterCatalog, Team};
use crate::composition::resolve_composition;
use crate::distribution::Distribution;
use crate::modifier::{ModifierEngine, Selection};
use crate::script::Script;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub selection: Vec<String>,
    pub counts: Distribution,
    pub applied_modifiers: Vec<String>,
}

/// Complete a partial selection into a legal lineup.
///
/// Order of work: base table, composition override, seed each team up to
/// the target in pool order, then the modifier rules. Anything that could
/// not be satisfied is left in `applied_modifiers` rather than failing.
pub fn resolve(
    script: &Script,
    catalog: &CharacterCatalog,
    player_count: u32,
    partial_selection: &[String],
) -> ResolutionResult {
    let mut audit = Vec::new();

    let base = Distribution::base_setup(player_count);
    let composition = resolve_composition(script.composition.as_ref(), player_count, base);
    audit.extend(composition.notes);
    if let Some(key) = &composition.matched_key {
        audit.push(format!(
            "composition '{}' sets {} (base {})",
            key, composition.distribution, base
        ));
    }
    let target = composition.distribution;

    let mut selection = Selection::default();
    for id in partial_selection {
        if script.in_pool(id) {
            selection.insert(id.clone());
        } else {
            audit.push(format!("ignored {}: not in script '{}'", id, script.id));
        }
    }

    let engine = ModifierEngine::new(script, catalog);
    engine.seed(&mut selection, target, &mut audit);
    engine.fill(&mut selection, &mut audit);

    let counts = Distribution::tally(catalog, selection.ids());
    let expected = target.adjusted(&engine.active_delta(selection.ids()));
    for team in Team::ALL {
        if counts.get(team) != expected.get(team) {
            audit.push(format!(
                "final {} count {} differs from expected {}",
                team.label(),
                counts.get(team),
                expected.get(team)
            ));
        }
    }

    debug!(notes = audit.len(), "modifier audit complete");
    info!(script = %script.id, player_count, %counts, "resolved lineup");

    ResolutionResult {
        selection: selection.into_ids(),
        counts,
        applied_modifiers: audit,
    }
}
