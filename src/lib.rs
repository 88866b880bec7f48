//! Blood on the Clocktower lineup resolution and setup validation.
//!
//! Given a script (character pool, optional composition table, ordered
//! modifier rules), a character catalog and a player count, this crate can:
//!
//! - [`resolve`] a partial selection into a complete lineup, with an audit
//!   trail of every rule it applied;
//! - [`validate`] a storyteller's finished selection into typed issues;
//! - [`check_feasibility`] whether any legal lineup exists at all.
//!
//! Everything is a pure function of its inputs. Scripts and the catalog come
//! from a caller-owned [`ScriptRepository`].

pub mod builtin;
pub mod catalog;
pub mod composition;
pub mod distribution;
pub mod error;
pub mod feasibility;
pub mod modifier;
pub mod repository;
pub mod resolve;
pub mod script;
pub mod service;
pub mod telemetry;
pub mod validate;

pub use catalog::{Character, CharacterCatalog, Team};
pub use composition::{resolve_composition, CompositionOutcome, CountExpr, CountKey};
pub use distribution::{CountDelta, Distribution};
pub use error::{SetupError, SetupResult};
pub use feasibility::{check_feasibility, FeasibilityReport};
pub use modifier::{ModifierEngine, Selection};
pub use repository::{ScriptLibrary, ScriptRepository};
pub use resolve::{resolve, ResolutionResult};
pub use script::{Composition, CompositionRow, CountValue, ModifierRule, Script};
pub use service::{GameSetup, ResolveResponse, SetupRequest, SetupService, ValidateResponse};
pub use validate::{expected_distribution, validate, IssueKind, ValidationIssue, ValidationResult};
