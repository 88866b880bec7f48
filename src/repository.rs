//! Where scripts and the character catalog come from.
//!
//! Callers own a repository and hand the resolver and validator plain
//! references out of it. Nothing here is global or mutable after loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::builtin;
use crate::catalog::{Character, CharacterCatalog};
use crate::error::{closest_match, SetupError, SetupResult};
use crate::script::Script;

pub trait ScriptRepository {
    fn script(&self, id: &str) -> SetupResult<&Script>;

    fn catalog(&self) -> &CharacterCatalog;

    fn script_ids(&self) -> Vec<&str>;
}

/// In-memory snapshot of a catalog and the scripts that draw from it.
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    catalog: CharacterCatalog,
    scripts: Vec<Script>,
}

impl ScriptLibrary {
    /// Check every script against the catalog before accepting it.
    pub fn new(catalog: CharacterCatalog, scripts: Vec<Script>) -> SetupResult<Self> {
        for (idx, script) in scripts.iter().enumerate() {
            if scripts[..idx].iter().any(|s| s.id == script.id) {
                return Err(SetupError::InvalidData(format!(
                    "duplicate script id '{}'",
                    script.id
                )));
            }
            for (pos, id) in script.character_pool.iter().enumerate() {
                if script.character_pool[..pos].contains(id) {
                    return Err(SetupError::InvalidData(format!(
                        "script '{}' lists '{}' twice in its pool",
                        script.id, id
                    )));
                }
                if !catalog.contains(id) {
                    return Err(SetupError::InvalidData(format!(
                        "script '{}' references unknown character '{}'",
                        script.id, id
                    )));
                }
            }
            for rule in &script.modifiers {
                // Rules may name characters outside the pool; that only
                // degrades to audit notes at resolution time.
                for id in rule.referenced_ids() {
                    if !script.in_pool(id) {
                        debug!(script = %script.id, id, "modifier references character outside pool");
                    }
                }
            }
        }
        Ok(ScriptLibrary { catalog, scripts })
    }

    pub fn builtin() -> Self {
        ScriptLibrary {
            catalog: CharacterCatalog::from_trusted(builtin::characters()),
            scripts: builtin::scripts(),
        }
    }

    /// Load `characters.json` and every `scripts/*.json` under `dir`.
    ///
    /// Script files are read in file-name order so ids and error messages are
    /// stable across platforms.
    pub fn load_dir(dir: impl AsRef<Path>) -> SetupResult<Self> {
        let dir = dir.as_ref();
        let characters: Vec<Character> = read_json(&dir.join("characters.json"))?;
        let catalog = CharacterCatalog::new(characters)?;

        let scripts_dir = dir.join("scripts");
        let entries = fs::read_dir(&scripts_dir).map_err(|source| SetupError::Io {
            path: scripts_dir.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SetupError::Io {
                path: scripts_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut scripts = Vec::with_capacity(paths.len());
        for path in &paths {
            scripts.push(read_json::<Script>(path)?);
        }

        info!(
            dir = %dir.display(),
            characters = catalog.len(),
            scripts = scripts.len(),
            "loaded setup data"
        );
        ScriptLibrary::new(catalog, scripts)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> SetupResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| SetupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SetupError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl ScriptRepository for ScriptLibrary {
    fn script(&self, id: &str) -> SetupResult<&Script> {
        self.scripts
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SetupError::ScriptNotFound {
                id: id.to_string(),
                suggestion: closest_match(id, self.scripts.iter().map(|s| s.id.as_str())),
            })
    }

    fn catalog(&self) -> &CharacterCatalog {
        &self.catalog
    }

    fn script_ids(&self) -> Vec<&str> {
        self.scripts.iter().map(|s| s.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Team;

    #[test]
    fn test_builtin_library_is_consistent() {
        let library = ScriptLibrary::builtin();
        assert!(CharacterCatalog::new(builtin::characters()).is_ok());
        let rebuilt = ScriptLibrary::new(library.catalog().clone(), builtin::scripts());
        assert!(rebuilt.is_ok());

        let script = library.script("trouble_brewing").unwrap();
        assert_eq!(script.character_pool.len(), 22);
        assert_eq!(library.catalog().team_of("baron"), Some(Team::Minion));
        assert_eq!(library.script_ids(), vec!["trouble_brewing"]);
    }

    #[test]
    fn test_unknown_script_suggests_closest() {
        let library = ScriptLibrary::builtin();
        match library.script("trouble_brewng") {
            Err(SetupError::ScriptNotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("trouble_brewing"));
            }
            other => panic!("expected ScriptNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_id_missing_from_catalog_is_rejected() {
        let catalog = CharacterCatalog::new(vec![Character::new("chef", Team::Townsfolk)]).unwrap();
        let script = Script {
            id: "broken".to_string(),
            name: None,
            character_pool: vec!["chef".to_string(), "imp".to_string()],
            composition: None,
            modifiers: vec![],
        };
        let err = ScriptLibrary::new(catalog, vec![script]).unwrap_err();
        assert!(err.to_string().contains("unknown character 'imp'"));
    }

    #[test]
    fn test_duplicate_pool_entry_is_rejected() {
        let catalog = CharacterCatalog::new(vec![Character::new("chef", Team::Townsfolk)]).unwrap();
        let script = Script {
            id: "dup".to_string(),
            name: None,
            character_pool: vec!["chef".to_string(), "chef".to_string()],
            composition: None,
            modifiers: vec![],
        };
        assert!(ScriptLibrary::new(catalog, vec![script]).is_err());
    }

    #[test]
    fn test_load_dir_reads_characters_and_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("characters.json"),
            r#"[
                {"id": "a1", "team": "townsfolk"},
                {"id": "b1", "team": "outsider"},
                {"id": "c1", "team": "minion"},
                {"id": "d1", "team": "demon"}
            ]"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::write(
            dir.path().join("scripts").join("mini.json"),
            r#"{"id": "mini", "characterPool": ["a1", "b1", "c1", "d1"]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("scripts").join("README.md"), "ignored").unwrap();

        let library = ScriptLibrary::load_dir(dir.path()).unwrap();
        assert_eq!(library.script_ids(), vec!["mini"]);
        assert_eq!(library.catalog().len(), 4);
        assert!(library.script("mini").unwrap().modifiers.is_empty());
    }

    #[test]
    fn test_load_dir_reports_malformed_json_with_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("characters.json"), "[{").unwrap();

        let err = ScriptLibrary::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, SetupError::Json { .. }));
        assert!(err.to_string().contains("characters.json"));
    }

    #[test]
    fn test_load_dir_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptLibrary::load_dir(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SetupError::Io { .. }));
    }
}
