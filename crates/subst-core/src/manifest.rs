//! Reescritura del manifest de ejecución (`erc.yml`).
//!
//! Se fija `execution.cmd` con el comando de arranque y se conserva el resto
//! del documento. Los comentarios YAML no sobreviven a la reescritura.
use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::binds::BindSpec;
use crate::errors::SubstitutionError;
use crate::model::PipelineContext;
use crate::paths::join_relative;

const EXECUTION_KEY: &str = "execution";
const CMD_KEY: &str = "cmd";

#[derive(Debug, Error)]
pub enum ManifestFault {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("invalid YAML: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("could not serialize manifest: {0}")]
    Emit(#[source] serde_yaml::Error),
    #[error("manifest is not a mapping")]
    NotAMapping,
}

impl ManifestFault {
    /// Fallos del sistema de archivos (salvo manifest ausente) o de
    /// serialización; lo demás se atribuye al contenido del paquete.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ManifestFault::Read(e) => e.kind() != io::ErrorKind::NotFound,
            ManifestFault::Write(_) | ManifestFault::Emit(_) => true,
            ManifestFault::Parse(_) | ManifestFault::NotAMapping => false,
        }
    }
}

/// `<prefix> -v <bind> ... <tag>`.
pub fn run_command(runner_prefix: &str, binds: &[BindSpec], tag: &str) -> String {
    let mut parts = Vec::with_capacity(binds.len() + 2);
    parts.push(runner_prefix.trim().to_string());
    parts.extend(binds.iter().map(BindSpec::as_flag));
    parts.push(tag.to_string());
    parts.join(" ")
}

/// Lee y parsea el manifest; el nivel superior debe ser un mapping.
pub fn load_manifest(path: &Path) -> Result<Mapping, ManifestFault> {
    let raw = fs::read_to_string(path).map_err(ManifestFault::Read)?;
    match serde_yaml::from_str::<Value>(&raw).map_err(ManifestFault::Parse)? {
        Value::Mapping(map) => Ok(map),
        _ => Err(ManifestFault::NotAMapping),
    }
}

/// Asegura la sección `execution` (reemplazándola si no es un mapping) y fija
/// `execution.cmd`.
pub fn set_execution_cmd(doc: &mut Mapping, cmd: &str) {
    let key = Value::from(EXECUTION_KEY);
    if !matches!(doc.get(&key), Some(Value::Mapping(_))) {
        doc.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(execution)) = doc.get_mut(&key) {
        execution.insert(Value::from(CMD_KEY), Value::from(cmd));
    }
}

pub fn rewrite_manifest(path: &Path, cmd: &str) -> Result<(), ManifestFault> {
    let mut doc = load_manifest(path)?;
    set_execution_cmd(&mut doc, cmd);
    let out = serde_yaml::to_string(&doc).map_err(ManifestFault::Emit)?;
    fs::write(path, out).map_err(ManifestFault::Write)
}

/// Rutas que el manifest declara como artefactos de ejecución (`main`,
/// `display`), sólo si son strings.
pub fn declared_assets(doc: &Mapping) -> Vec<String> {
    ["main", "display"].iter()
                       .filter_map(|k| doc.get(&Value::from(*k)).and_then(Value::as_str))
                       .map(str::to_string)
                       .collect()
}

/// Etapa `RewriteManifest`.
pub fn rewrite_manifest_stage(mut ctx: PipelineContext,
                              manifest_file: &str,
                              runner_prefix: &str,
                              tag: &str)
                              -> Result<PipelineContext, SubstitutionError> {
    let path = join_relative(&ctx.working_dir, manifest_file);
    let cmd = run_command(runner_prefix, &ctx.bind_specs, tag);
    rewrite_manifest(&path, &cmd).map_err(|fault| SubstitutionError::ManifestWriteFailed { path: path.clone(), fault })?;
    debug!("[{}] wrote execution.cmd to {}", ctx.new_id, path.display());
    ctx.run_command = Some(cmd);
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_joins_prefix_binds_and_tag() {
        let binds = vec![BindSpec::read_write("/c/b/data", "/erc"),
                         BindSpec::read_only("/c/n/data/BerlinOhne.csv", "/erc/BerlinMit.csv")];
        assert_eq!(run_command("docker run -it --rm", &binds, "bagtainer:substn"),
                   "docker run -it --rm -v /c/b/data:/erc -v /c/n/data/BerlinOhne.csv:/erc/BerlinMit.csv:ro bagtainer:substn");
    }

    #[test]
    fn rewrite_preserves_other_keys_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("erc.yml");
        fs::write(&path, "id: abc\nexecution:\n  cmd: old\n  timeout: 30\nmain: main.Rmd\n").unwrap();

        rewrite_manifest(&path, "docker run x").unwrap();
        let doc = load_manifest(&path).unwrap();
        assert_eq!(doc.get("id").and_then(Value::as_str), Some("abc"));
        assert_eq!(doc["execution"]["cmd"].as_str(), Some("docker run x"));
        assert_eq!(doc["execution"]["timeout"].as_u64(), Some(30));
        let keys: Vec<&str> = doc.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["id", "execution", "main"]);
    }

    #[test]
    fn missing_or_scalar_execution_section_is_created() {
        let mut doc: Mapping = serde_yaml::from_str("execution: 3\n").unwrap();
        set_execution_cmd(&mut doc, "run");
        assert_eq!(doc["execution"]["cmd"].as_str(), Some("run"));

        let mut doc = Mapping::new();
        set_execution_cmd(&mut doc, "run");
        assert_eq!(doc["execution"]["cmd"].as_str(), Some("run"));
    }

    #[test]
    fn faults_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_manifest(&dir.path().join("nope.yml")).unwrap_err();
        assert!(!missing.is_unavailable());

        let path = dir.path().join("erc.yml");
        fs::write(&path, "- a\n- b\n").unwrap();
        assert!(matches!(load_manifest(&path), Err(ManifestFault::NotAMapping)));
        fs::write(&path, "a: [unclosed\n").unwrap();
        assert!(matches!(load_manifest(&path), Err(ManifestFault::Parse(_))));
        assert!(ManifestFault::Write(io::Error::new(io::ErrorKind::PermissionDenied, "ro")).is_unavailable());
    }

    #[test]
    fn declared_assets_only_takes_strings() {
        let doc: Mapping = serde_yaml::from_str("main: main.Rmd\ndisplay: [a]\n").unwrap();
        assert_eq!(declared_assets(&doc), vec!["main.Rmd".to_string()]);
    }
}
