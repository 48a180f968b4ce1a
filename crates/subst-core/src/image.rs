//! Construcción de la imagen del paquete sustituido (seam con el engine de
//! contenedores).
use std::io;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

use crate::binds::BindSpec;
use crate::constants::{DOCKERFILE, IMAGE_NAME_PREFIX};
use crate::errors::SubstitutionError;
use crate::manifest::{declared_assets, load_manifest};
use crate::model::PipelineContext;
use crate::paths::join_relative;

#[derive(Debug, Error)]
pub enum EngineError {
    /// El daemon/binario no responde o no existe.
    #[error("container engine unavailable: {0}")]
    Unavailable(String),
    #[error("build context is missing {0}")]
    MissingContextFile(String),
    #[error("build rejected (status {status:?}): {stderr}")]
    BuildRejected { status: Option<i32>, stderr: String },
    #[error("run failed (status {status:?}): {stderr}")]
    RunFailed { status: Option<i32>, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_) | EngineError::Io(_))
    }
}

/// Resultado de `ContainerEngine::run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Construye `tag` usando `context_dir` como contexto; `files` son rutas
    /// relativas al contexto que deben incluirse.
    async fn build(&self, context_dir: &Path, files: &[String], tag: &str) -> Result<(), EngineError>;
    /// Arranca la imagen con los binds dados y espera a que termine.
    async fn run(&self, tag: &str, binds: &[BindSpec]) -> Result<RunReport, EngineError>;
}

/// `<namespace>:subst<id>` en minúsculas.
pub fn image_tag(namespace: &str, new_id: &str) -> String {
    format!("{namespace}:{IMAGE_NAME_PREFIX}{new_id}").to_lowercase()
}

/// Archivos del contexto de build: `Dockerfile` (siempre), el manifest, sus
/// `main`/`display` y la ruta base de cada entrada. Los que no existen en el
/// directorio de trabajo se omiten, salvo `Dockerfile`; sin duplicados.
pub fn build_file_list(working_dir: &Path, manifest_file: &str, ctx: &PipelineContext) -> Vec<String> {
    let mut files = vec![DOCKERFILE.to_string()];
    let mut push = |rel: &str| {
        let rel = rel.trim_start_matches('/').to_string();
        if !rel.is_empty() && !files.contains(&rel) && join_relative(working_dir, &rel).exists() {
            files.push(rel);
        }
    };
    push(manifest_file);
    if let Ok(doc) = load_manifest(&join_relative(working_dir, manifest_file)) {
        for asset in declared_assets(&doc) {
            push(&asset);
        }
    }
    for entry in ctx.substitution.entries() {
        push(entry.base());
    }
    files
}

/// Etapa `BuildImage`.
pub async fn build_image<C>(engine: &C,
                            mut ctx: PipelineContext,
                            namespace: &str,
                            manifest_file: &str)
                            -> Result<PipelineContext, SubstitutionError>
    where C: ContainerEngine + ?Sized
{
    let tag = image_tag(namespace, &ctx.new_id);
    let files = build_file_list(&ctx.working_dir, manifest_file, &ctx);
    debug!("[{}] building image {tag} from {} files", ctx.new_id, files.len());
    if let Err(e) = engine.build(&ctx.working_dir, &files, &tag).await {
        error!("[{}] image build failed: {e}", ctx.new_id);
        return Err(SubstitutionError::ImageBuildFailed(e));
    }
    ctx.image_tag = Some(tag);
    Ok(ctx)
}
