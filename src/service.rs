//! Request/response surface used by the lobby's setup screen.
//!
//! Transport is somebody else's problem: these types are what the HTTP
//! handlers deserialize and serialize, and [`SetupService`] is what they call.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::repository::ScriptRepository;
use crate::resolve::{resolve, ResolutionResult};
use crate::script::Script;
use crate::validate::{validate, ValidationResult};

/// The parts of a game's state the setup paths need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSetup {
    pub script_id: Option<String>,
    pub player_count: u32,
    pub storyteller_seat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub storyteller_seat_id: String,
    #[serde(default)]
    pub character_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineup: Option<ResolutionResult>,
}

impl ResolveResponse {
    fn failure(error: impl Into<String>) -> Self {
        ResolveResponse {
            success: false,
            error: Some(error.into()),
            lineup: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub success: bool,
    pub valid: bool,
    pub details: Vec<String>,
}

impl ValidateResponse {
    fn failure(error: impl Into<String>) -> Self {
        ValidateResponse {
            success: false,
            valid: false,
            details: vec![error.into()],
        }
    }
}

pub struct SetupService<R> {
    repository: R,
}

impl<R: ScriptRepository> SetupService<R> {
    pub fn new(repository: R) -> Self {
        SetupService { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn check_caller(&self, game: &GameSetup, request: &SetupRequest) -> Result<(), String> {
        if request.storyteller_seat_id != game.storyteller_seat_id {
            warn!(
                seat = %request.storyteller_seat_id,
                "setup request from a seat that is not the storyteller"
            );
            return Err("Only the storyteller can change the character setup".to_string());
        }
        if game.player_count == 0 {
            return Err("The game has no players yet".to_string());
        }
        Ok(())
    }

    fn active_script(&self, game: &GameSetup) -> Result<Option<&Script>, String> {
        match &game.script_id {
            Some(id) => self
                .repository
                .script(id)
                .map(Some)
                .map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    /// Auto-complete the storyteller's partial pick.
    pub fn resolve(&self, game: &GameSetup, request: &SetupRequest) -> ResolveResponse {
        if let Err(error) = self.check_caller(game, request) {
            return ResolveResponse::failure(error);
        }
        let script = match self.active_script(game) {
            Ok(Some(script)) => script,
            Ok(None) => return ResolveResponse::failure("No script is selected for this game"),
            Err(error) => return ResolveResponse::failure(error),
        };

        let lineup = resolve(
            script,
            self.repository.catalog(),
            game.player_count,
            &request.character_ids,
        );
        ResolveResponse {
            success: true,
            error: None,
            lineup: Some(lineup),
        }
    }

    /// Check the storyteller's finished pick.
    pub fn validate(&self, game: &GameSetup, request: &SetupRequest) -> ValidateResponse {
        if let Err(error) = self.check_caller(game, request) {
            return ValidateResponse::failure(error);
        }
        let script = match self.active_script(game) {
            Ok(script) => script,
            Err(error) => return ValidateResponse::failure(error),
        };

        let result: ValidationResult = validate(
            script,
            self.repository.catalog(),
            game.player_count,
            &request.character_ids,
        );
        ValidateResponse {
            success: true,
            valid: result.is_valid,
            details: result.details(),
        }
    }
}
