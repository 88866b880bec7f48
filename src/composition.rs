//! Script-specific composition overrides.
//!
//! Formulas are parsed into [`CountExpr`] and evaluated directly. The grammar
//! is closed: an integer, `p`, `p+N` or `p-N`.

use std::fmt;

use tracing::warn;

use crate::catalog::Team;
use crate::distribution::Distribution;
use crate::script::{Composition, CompositionRow, CountValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKey {
    Exact(u32),
    Range(u32, u32),
}

impl CountKey {
    pub fn parse(key: &str) -> Option<CountKey> {
        let key = key.trim();
        if let Some((lo, hi)) = key.split_once('-') {
            let lo = lo.trim().parse::<u32>().ok()?;
            let hi = hi.trim().parse::<u32>().ok()?;
            Some(CountKey::Range(lo, hi))
        } else {
            key.parse::<u32>().ok().map(CountKey::Exact)
        }
    }

    pub fn matches(&self, player_count: u32) -> bool {
        match *self {
            CountKey::Exact(n) => n == player_count,
            CountKey::Range(lo, hi) => lo <= player_count && player_count <= hi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountExpr {
    Literal(i64),
    Players,
    PlayersPlus(i64),
    PlayersMinus(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    Empty,
    Unsupported(String),
    Negative(i64),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Empty => write!(f, "empty expression"),
            ExprError::Unsupported(s) => write!(f, "unsupported expression '{}'", s),
            ExprError::Negative(n) => write!(f, "evaluates to negative count {}", n),
        }
    }
}

impl CountExpr {
    pub fn parse(input: &str) -> Result<CountExpr, ExprError> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == '\u{2212}' { '-' } else { c })
            .collect();

        if compact.is_empty() {
            return Err(ExprError::Empty);
        }
        let unsupported = || ExprError::Unsupported(input.trim().to_string());

        if let Ok(n) = compact.parse::<i64>() {
            return Ok(CountExpr::Literal(n));
        }

        let rest = match compact.strip_prefix('p').or_else(|| compact.strip_prefix('P')) {
            Some(rest) => rest,
            None => return Err(unsupported()),
        };
        if rest.is_empty() {
            return Ok(CountExpr::Players);
        }

        let mut chars = rest.chars();
        let op = chars.next();
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(unsupported());
        }
        let n = digits.parse::<i64>().map_err(|_| unsupported())?;
        match op {
            Some('+') => Ok(CountExpr::PlayersPlus(n)),
            Some('-') => Ok(CountExpr::PlayersMinus(n)),
            _ => Err(unsupported()),
        }
    }

    pub fn eval(&self, player_count: u32) -> Result<u32, ExprError> {
        let p = i64::from(player_count);
        let value = match *self {
            CountExpr::Literal(n) => n,
            CountExpr::Players => p,
            CountExpr::PlayersPlus(n) => p.saturating_add(n),
            CountExpr::PlayersMinus(n) => p.saturating_sub(n),
        };
        if value < 0 {
            return Err(ExprError::Negative(value));
        }
        u32::try_from(value).map_err(|_| ExprError::Unsupported(value.to_string()))
    }
}

/// Outcome of applying a composition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionOutcome {
    pub distribution: Distribution,
    pub matched_key: Option<String>,
    /// Skipped keys and per-team fallbacks, in the order they happened.
    pub notes: Vec<String>,
}

pub fn resolve_composition(
    composition: Option<&Composition>,
    player_count: u32,
    base: Distribution,
) -> CompositionOutcome {
    let mut outcome = CompositionOutcome {
        distribution: base,
        matched_key: None,
        notes: Vec::new(),
    };
    let Some(composition) = composition else {
        return outcome;
    };

    for (key, row) in &composition.entries {
        let Some(count_key) = CountKey::parse(key) else {
            let note = format!("composition key '{}' is not a count or range; skipped", key);
            warn!(key = %key, "unparseable composition key");
            outcome.notes.push(note);
            continue;
        };
        if !count_key.matches(player_count) {
            continue;
        }

        outcome.distribution = evaluate_row(key, row, player_count, base, &mut outcome.notes);
        outcome.matched_key = Some(key.clone());
        break;
    }

    outcome
}

fn evaluate_row(
    key: &str,
    row: &CompositionRow,
    player_count: u32,
    base: Distribution,
    notes: &mut Vec<String>,
) -> Distribution {
    let mut resolved = base;
    for team in Team::ALL {
        let value = match team {
            Team::Townsfolk => row.townsfolk.as_ref(),
            Team::Outsider => row.outsiders.as_ref(),
            Team::Minion => row.minions.as_ref(),
            Team::Demon => row.demons.as_ref(),
        };

        let evaluated = match value {
            None => Err("no value given".to_string()),
            Some(CountValue::Literal(n)) => CountExpr::Literal(*n)
                .eval(player_count)
                .map_err(|e| e.to_string()),
            Some(CountValue::Float(x)) if x.is_finite() && x.fract() == 0.0 => {
                CountExpr::Literal(*x as i64)
                    .eval(player_count)
                    .map_err(|e| e.to_string())
            }
            Some(CountValue::Float(x)) => Err(format!("non-integer count {}", x)),
            Some(CountValue::Formula(s)) => CountExpr::parse(s)
                .and_then(|expr| expr.eval(player_count))
                .map_err(|e| e.to_string()),
            Some(CountValue::Other(v)) => Err(format!("unsupported value {}", v)),
        };

        match evaluated {
            Ok(count) => resolved.set(team, count),
            Err(reason) => {
                warn!(key = %key, team = team.label(), %reason, "composition value fell back");
                notes.push(format!(
                    "composition '{}' {}: {}; kept {}",
                    key,
                    team.label(),
                    reason,
                    base.get(team)
                ));
            }
        }
    }
    resolved
}
