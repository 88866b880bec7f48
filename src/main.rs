use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use botc_lineup::error::{closest_match, SetupError};
use botc_lineup::telemetry::init_tracing;
use botc_lineup::{
    check_feasibility, resolve, validate, FeasibilityReport, ResolutionResult, Script,
    ScriptLibrary, ScriptRepository, ValidationResult,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};

/// BotC lineup resolver and setup validator
#[derive(Parser, Debug)]
#[command(name = "botc-lineup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve and validate Blood on the Clocktower character lineups", long_about = None)]
struct Cli {
    /// Directory holding characters.json and scripts/*.json (default: built-in scripts)
    #[arg(long, global = true, env = "BOTC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Without a subcommand: resolve a lineup
    #[command(flatten)]
    lineup: LineupArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
struct LineupArgs {
    /// Script id (e.g. "trouble_brewing")
    #[arg(long)]
    script: Option<String>,

    /// Number of players
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    players: Option<u32>,

    /// Selected characters, comma or space separated: "imp,baron" or "{imp baron}"
    #[arg(long)]
    select: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a partial selection into a full lineup (the default)
    Resolve(LineupArgs),

    /// Validate a completed selection
    Validate(LineupArgs),

    /// Check whether any legal lineup exists that contains the selection
    Feasible(LineupArgs),

    /// List available scripts
    Scripts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LineupOutput<'a, T: Serialize> {
    script_id: &'a str,
    player_count: u32,
    #[serde(flatten)]
    result: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptSummary<'a> {
    id: &'a str,
    name: &'a str,
    characters: usize,
    modifiers: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.json_logs, level);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let library = match &cli.data_dir {
        Some(dir) => ScriptLibrary::load_dir(dir)
            .with_context(|| format!("loading setup data from {}", dir.display()))?,
        None => ScriptLibrary::builtin(),
    };

    match cli.command {
        None => resolve_cmd(&library, &cli.lineup),
        Some(Command::Resolve(args)) => resolve_cmd(&library, &args),
        Some(Command::Validate(args)) => validate_cmd(&library, &args),
        Some(Command::Feasible(args)) => feasible_cmd(&library, &args),
        Some(Command::Scripts) => scripts_cmd(&library),
    }
}

struct LineupInput<'a> {
    script: &'a Script,
    player_count: u32,
    selection: Vec<String>,
}

fn load_input<'a>(library: &'a ScriptLibrary, args: &LineupArgs) -> Result<LineupInput<'a>> {
    let Some(script_id) = args.script.as_deref() else {
        bail!("--script is required (available: {})", library.script_ids().join(", "));
    };
    let Some(player_count) = args.players else {
        bail!("--players is required");
    };
    let script = library.script(script_id)?;
    let selection = match args.select.as_deref() {
        Some(raw) => parse_selection(raw, script, library)?,
        None => Vec::new(),
    };
    debug!(script = %script.id, player_count, selected = selection.len(), "parsed lineup input");

    Ok(LineupInput {
        script,
        player_count,
        selection,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_cmd(library: &ScriptLibrary, args: &LineupArgs) -> Result<ExitCode> {
    let input = load_input(library, args)?;
    let result: ResolutionResult = resolve(
        input.script,
        library.catalog(),
        input.player_count,
        &input.selection,
    );
    print_json(&LineupOutput {
        script_id: &input.script.id,
        player_count: input.player_count,
        result,
    })?;
    Ok(ExitCode::SUCCESS)
}

fn validate_cmd(library: &ScriptLibrary, args: &LineupArgs) -> Result<ExitCode> {
    let input = load_input(library, args)?;
    let result: ValidationResult = validate(
        Some(input.script),
        library.catalog(),
        input.player_count,
        &input.selection,
    );
    let valid = result.is_valid;
    print_json(&LineupOutput {
        script_id: &input.script.id,
        player_count: input.player_count,
        result,
    })?;
    Ok(if valid { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

fn feasible_cmd(library: &ScriptLibrary, args: &LineupArgs) -> Result<ExitCode> {
    let input = load_input(library, args)?;
    let report: FeasibilityReport = check_feasibility(
        input.script,
        library.catalog(),
        input.player_count,
        &input.selection,
    )?;
    let feasible = report.feasible;
    print_json(&LineupOutput {
        script_id: &input.script.id,
        player_count: input.player_count,
        result: report,
    })?;
    Ok(if feasible { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

fn scripts_cmd(library: &ScriptLibrary) -> Result<ExitCode> {
    let mut summaries = Vec::new();
    for id in library.script_ids() {
        let script = library.script(id)?;
        summaries.push(ScriptSummary {
            id: &script.id,
            name: script.title(),
            characters: script.character_pool.len(),
            modifiers: script.modifiers.len(),
        });
    }
    print_json(&summaries)?;
    Ok(ExitCode::SUCCESS)
}

// Selection parsing: "{imp baron}", "imp,baron" or "imp, fortune teller".
// Names match pool ids or catalog display names, case-insensitively, with
// spaces and dashes treated as underscores.
fn parse_selection(
    input: &str,
    script: &Script,
    library: &ScriptLibrary,
) -> Result<Vec<String>, SetupError> {
    let trimmed = input.trim();
    let content = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    // Commas separate entries; within an entry, whitespace separates
    // entries only when the whole entry is not itself a known name.
    let mut ids = Vec::new();
    for entry in content.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match match_character(entry, script, library) {
            Some(id) => ids.push(id),
            None => {
                for token in entry.split_whitespace() {
                    let id = match_character(token, script, library).ok_or_else(|| {
                        SetupError::UnknownCharacter {
                            id: token.to_string(),
                            script_id: script.id.clone(),
                            suggestion: closest_match(
                                &normalize(token),
                                script.character_pool.iter().map(String::as_str),
                            ),
                        }
                    })?;
                    ids.push(id);
                }
            }
        }
    }
    Ok(ids)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

fn match_character(name: &str, script: &Script, library: &ScriptLibrary) -> Option<String> {
    let wanted = normalize(name);
    script
        .character_pool
        .iter()
        .find(|id| {
            normalize(id) == wanted
                || library
                    .catalog()
                    .get(id)
                    .and_then(|c| c.name.as_deref())
                    .is_some_and(|n| normalize(n) == wanted)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tb(library: &ScriptLibrary) -> &Script {
        library.script("trouble_brewing").unwrap()
    }

    #[test]
    fn test_parse_selection_commas_and_braces() {
        let library = ScriptLibrary::builtin();
        let script = tb(&library);

        assert_eq!(
            parse_selection("imp,baron", script, &library).unwrap(),
            vec!["imp".to_string(), "baron".to_string()]
        );
        assert_eq!(
            parse_selection("{soldier, mayor imp}", script, &library).unwrap(),
            vec!["soldier".to_string(), "mayor".to_string(), "imp".to_string()]
        );
        assert!(parse_selection("", script, &library).unwrap().is_empty());
    }

    #[test]
    fn test_parse_selection_accepts_display_names() {
        let library = ScriptLibrary::builtin();
        let script = tb(&library);

        assert_eq!(
            parse_selection("Fortune Teller, scarlet-woman", script, &library).unwrap(),
            vec!["fortune_teller".to_string(), "scarlet_woman".to_string()]
        );
    }

    #[test]
    fn test_parse_selection_unknown_name_suggests() {
        let library = ScriptLibrary::builtin();
        let script = tb(&library);

        let err = parse_selection("imp,fortune_teler", script, &library).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown character 'fortune_teler' for script 'trouble_brewing' (did you mean 'fortune_teller'?)"
        );
    }

    #[test]
    fn test_cli_flags_parse_without_subcommand() {
        let cli = Cli::try_parse_from([
            "botc-lineup",
            "--script",
            "trouble_brewing",
            "--players",
            "7",
            "--select",
            "imp",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.lineup.players, Some(7));

        assert!(Cli::try_parse_from(["botc-lineup", "--players", "0"]).is_err());
    }
}
