//! Línea de comandos de `substflow`.
use clap::{Args, Parser, Subcommand};
use subst_core::{EntryDraft, ErrorClass, SubstitutionDraft, SubstitutionError};

#[derive(Debug, Parser)]
#[command(name = "substflow")]
#[command(about = "Derive a new compendium by substituting overlay files into a base compendium")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the substitution pipeline and print the resulting package as JSON.
    Substitute(SubstituteArgs),
}

#[derive(Debug, Args)]
pub struct SubstituteArgs {
    /// Identifier of the base compendium
    #[arg(long)]
    pub base: String,

    /// Identifier of the overlay compendium
    #[arg(long)]
    pub overlay: String,

    /// Substitution entry as `<base path>=<overlay path>` (repeatable, in order)
    #[arg(long = "file", value_parser = parse_file_pair)]
    pub files: Vec<(String, String)>,

    /// Requesting user, stored as owner of the new compendium
    #[arg(long)]
    pub user: String,

    /// Identifier for the new compendium (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Start the built image with the planned bind mounts afterwards
    #[arg(long)]
    pub run: bool,
}

impl SubstituteArgs {
    pub fn to_draft(&self) -> SubstitutionDraft {
        let entries = self.files.iter().map(|(b, o)| EntryDraft::new(b, o)).collect();
        SubstitutionDraft::new(&self.base, &self.overlay, entries)
    }
}

pub fn parse_file_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((base, overlay)) if !base.is_empty() && !overlay.is_empty() => Ok((base.to_string(), overlay.to_string())),
        _ => Err(format!("expected <base>=<overlay>, got {raw:?}")),
    }
}

/// Salida exitosa.
pub const EXIT_OK: i32 = 0;
/// Uso o configuración inválidos.
pub const EXIT_USAGE: i32 = 2;
/// Error atribuible a la solicitud (equivalente a 400).
pub const EXIT_REJECTED: i32 = 4;
/// Error del sistema o de sus dependencias (equivalente a 500).
pub const EXIT_FAILURE: i32 = 5;

pub fn exit_code(err: &SubstitutionError) -> i32 {
    match err.class() {
        ErrorClass::UserInput | ErrorClass::Operational => EXIT_REJECTED,
        ErrorClass::Unavailable | ErrorClass::Internal => EXIT_FAILURE,
    }
}
