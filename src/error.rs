//! Fatal errors: anything that stops a lineup from being resolved at all.
//!
//! Soft problems (an exhausted pool, a rule naming an unknown character, a
//! bad composition formula) never show up here; they become audit notes or
//! validation issues instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    /// The requested script id is not in the repository.
    #[error("unknown script '{id}'{}", suggestion_suffix(.suggestion))]
    ScriptNotFound {
        id: String,
        suggestion: Option<String>,
    },

    /// A character id given on input is not part of the script's pool.
    #[error("unknown character '{id}' for script '{script_id}'{}", suggestion_suffix(.suggestion))]
    UnknownCharacter {
        id: String,
        script_id: String,
        suggestion: Option<String>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Script or character data parsed but is inconsistent.
    #[error("invalid setup data: {0}")]
    InvalidData(String),

    #[error("SAT solver failure: {0}")]
    Solver(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Closest candidate by Jaro-Winkler similarity, if any is close enough to
/// be worth suggesting.
pub fn closest_match<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized_input = input.to_lowercase();
    let mut best: Option<(&str, f64)> = None;

    for candidate in candidates {
        let similarity = strsim::jaro_winkler(&normalized_input, &candidate.to_lowercase());
        if similarity < 0.7 {
            continue;
        }
        // Ties keep the earlier candidate so suggestions follow declaration order.
        match best {
            Some((_, best_sim)) if best_sim >= similarity => {}
            _ => best = Some((candidate, similarity)),
        }
    }

    best.map(|(candidate, _)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_not_found_message_includes_suggestion() {
        let err = SetupError::ScriptNotFound {
            id: "troble_brewing".to_string(),
            suggestion: Some("trouble_brewing".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown script 'troble_brewing' (did you mean 'trouble_brewing'?)"
        );
    }

    #[test]
    fn test_script_not_found_message_without_suggestion() {
        let err = SetupError::ScriptNotFound {
            id: "zzz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown script 'zzz'");
    }

    #[test]
    fn test_closest_match_prefers_most_similar() {
        let candidates = ["chef", "empath", "fortune_teller"];
        assert_eq!(
            closest_match("fortune_teler", candidates.iter().copied()),
            Some("fortune_teller".to_string())
        );
        assert_eq!(closest_match("qqqq", candidates.iter().copied()), None);
    }
}
