//! Engine de contenedores que invoca la CLI de Docker.
//!
//! `build` copia sólo los archivos listados a un contexto temporal y ejecuta
//! `docker build -t <tag> .` allí, así el contexto enviado al daemon es
//! exactamente la lista pedida. `run` es `docker run --rm -v ... <tag>`.
use std::io;
use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use log::{debug, info};
use subst_core::constants::DOCKERFILE;
use subst_core::materialize::copy_tree;
use subst_core::{BindSpec, ContainerEngine, EngineError, RunReport};
use tempfile::TempDir;
use tokio::process::Command;

pub const DEFAULT_DOCKER_BIN: &str = "docker";

// Mensaje de la CLI cuando el daemon no responde.
const DAEMON_DOWN: &str = "Cannot connect to the Docker daemon";

#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_BIN)
    }
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    pub fn build_args(tag: &str) -> Vec<String> {
        vec!["build".into(), "-t".into(), tag.into(), ".".into()]
    }

    pub fn run_args(tag: &str, binds: &[BindSpec]) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        for bind in binds {
            args.push("-v".into());
            args.push(bind.to_string());
        }
        args.push(tag.to_string());
        args
    }

    /// Copia `files` (relativos a `context_dir`) a un directorio temporal.
    /// Sin Dockerfile no hay build; el resto de ausentes se omite.
    pub fn stage_context(context_dir: &Path, files: &[String]) -> Result<TempDir, EngineError> {
        let staged = tempfile::Builder::new().prefix("subst-build-").tempdir()?;
        for rel in files {
            let src = context_dir.join(rel);
            let dst = staged.path().join(rel);
            if src.is_dir() {
                copy_tree(&src, &dst)?;
            } else if src.is_file() {
                if let Some(parent) = dst.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&src, &dst)?;
            } else if rel == DOCKERFILE {
                return Err(EngineError::MissingContextFile(rel.clone()));
            } else {
                debug!("skipping missing build file {rel}");
            }
        }
        if !staged.path().join(DOCKERFILE).is_file() {
            return Err(EngineError::MissingContextFile(DOCKERFILE.to_string()));
        }
        Ok(staged)
    }

    async fn exec(&self, args: &[String], cwd: Option<&Path>) -> Result<Output, EngineError> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.output().await.map_err(|e| match e.kind() {
                              io::ErrorKind::NotFound => EngineError::Unavailable(format!("{} not found", self.bin)),
                              _ => EngineError::Io(e),
                          })
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn build(&self, context_dir: &Path, files: &[String], tag: &str) -> Result<(), EngineError> {
        let staged = Self::stage_context(context_dir, files)?;
        info!("building {tag} from {} ({} files)", context_dir.display(), files.len());
        let output = self.exec(&Self::build_args(tag), Some(staged.path())).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = stderr_of(&output);
        if stderr.contains(DAEMON_DOWN) {
            return Err(EngineError::Unavailable(stderr));
        }
        Err(EngineError::BuildRejected { status: output.status.code(),
                                         stderr })
    }

    async fn run(&self, tag: &str, binds: &[BindSpec]) -> Result<RunReport, EngineError> {
        let output = self.exec(&Self::run_args(tag, binds), None).await?;
        let report = RunReport { status: output.status.code(),
                                 stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                                 stderr: stderr_of(&output) };
        if output.status.success() {
            return Ok(report);
        }
        if report.stderr.contains(DAEMON_DOWN) {
            return Err(EngineError::Unavailable(report.stderr));
        }
        Err(EngineError::RunFailed { status: report.status,
                                     stderr: report.stderr })
    }
}
