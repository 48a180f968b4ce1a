//! Implementación del orquestador.
//!
//! Máquina de estados lineal sobre `PipelineStage::ORDER`. El contexto se
//! mueve de etapa en etapa; ante el primer error se registra `StageFailed`, se
//! compensa (directorio del paquete nuevo y, si ya se guardó, su registro) y
//! se devuelve el error original sin modificar.
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, error, info, warn};
use serde_json::json;
use subst_domain::{generate_package_id, SubstitutionDraft, SubstitutionRequest};

use crate::binds::plan_binds_stage;
use crate::config::PipelineConfig;
use crate::constants::PIPELINE_VERSION;
use crate::engine::EngineBuilder;
use crate::errors::SubstitutionError;
use crate::event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
use crate::hashing::hash_value;
use crate::image::{build_image, image_tag, ContainerEngine, RunReport};
use crate::manifest::rewrite_manifest_stage;
use crate::materialize::{copy_base, copy_overlays, create_working_dir};
use crate::model::{PipelineContext, PipelineOutcome};
use crate::persist::persist;
use crate::repo::PackageStore;
use crate::stage::PipelineStage;
use crate::validate::{validate_metadata, validate_overlay};

pub struct SubstitutionEngine<S, C, E = InMemoryEventStore>
    where S: PackageStore,
          C: ContainerEngine,
          E: EventStore
{
    config: PipelineConfig,
    store: S,
    container: C,
    events: E,
}

impl<S, C> SubstitutionEngine<S, C, InMemoryEventStore>
    where S: PackageStore,
          C: ContainerEngine
{
    pub fn builder(config: PipelineConfig, store: S, container: C) -> EngineBuilder<S, C, InMemoryEventStore> {
        EngineBuilder { config,
                        store,
                        container,
                        events: InMemoryEventStore::default() }
    }

    pub fn new(config: PipelineConfig, store: S, container: C) -> Self {
        Self::builder(config, store, container).build()
    }
}

/// Qué debe deshacer la compensación.
#[derive(Debug, Clone, Copy, Default)]
struct Compensation {
    /// El directorio del paquete lo creó esta ejecución.
    owns_dir: bool,
    record_saved: bool,
}

impl<S, C, E> SubstitutionEngine<S, C, E>
    where S: PackageStore,
          C: ContainerEngine,
          E: EventStore
{
    pub(crate) fn from_parts(config: PipelineConfig, store: S, container: C, events: E) -> Self {
        Self { config,
               store,
               container,
               events }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    /// Eventos emitidos para el paquete `run_id`.
    pub fn events(&self, run_id: &str) -> Vec<PipelineEvent> {
        self.events.list(run_id)
    }

    /// Valida el borrador y ejecuta el pipeline. Sin `new_id` se genera uno.
    pub async fn substitute(&mut self,
                            draft: SubstitutionDraft,
                            requesting_user: &str,
                            new_id: Option<String>)
                            -> Result<PipelineOutcome, SubstitutionError> {
        let request = draft.validate()?;
        let new_id = new_id.unwrap_or_else(generate_package_id);
        self.run(&new_id, requesting_user, request).await
    }

    /// Ejecuta todas las etapas para `new_id`. Todo o nada.
    pub async fn run(&mut self,
                     new_id: &str,
                     requesting_user: &str,
                     request: SubstitutionRequest)
                     -> Result<PipelineOutcome, SubstitutionError> {
        if !is_valid_package_id(new_id) {
            return Err(SubstitutionError::PathEscapesPackage { path: new_id.to_string() });
        }
        let package_dir = self.config.layout.package_dir(new_id);
        self.events.append_kind(new_id,
                                PipelineEventKind::PipelineInitialized { base_id: request.base_id().to_string(),
                                                                         overlay_id: request.overlay_id().to_string(),
                                                                         entry_count: request.len() });
        debug!("[{new_id}] starting substitution of {} with {}", request.base_id(), request.overlay_id());

        let mut ctx = PipelineContext::new(new_id, requesting_user, request, &self.config.layout);
        let mut undo = Compensation::default();
        for stage in PipelineStage::ORDER {
            self.events.append_kind(new_id, PipelineEventKind::StageStarted { stage });
            if stage == PipelineStage::CreateWorkingDir {
                undo.owns_dir = !package_dir.exists();
            }
            match self.run_stage(stage, ctx, &package_dir).await {
                Ok(next) => {
                    ctx = next;
                    if stage == PipelineStage::Persist {
                        undo.record_saved = true;
                    }
                    self.events.append_kind(new_id, PipelineEventKind::StageFinished { stage });
                }
                Err(err) => {
                    warn!("[{new_id}] stage {stage} failed: {err}");
                    self.events.append_kind(new_id,
                                            PipelineEventKind::StageFailed { stage,
                                                                             error: err.to_string(),
                                                                             class: err.class() });
                    if stage.requires_cleanup() {
                        self.compensate(new_id, &package_dir, undo).await;
                    }
                    return Err(err);
                }
            }
        }
        self.finalize(ctx)
    }

    async fn run_stage(&self,
                       stage: PipelineStage,
                       ctx: PipelineContext,
                       package_dir: &Path)
                       -> Result<PipelineContext, SubstitutionError> {
        let cfg = &self.config;
        match stage {
            PipelineStage::ValidateMetadata => validate_metadata(&self.store, ctx).await,
            PipelineStage::ValidateOverlay => validate_overlay(&self.store, ctx).await,
            PipelineStage::CreateWorkingDir => create_working_dir(ctx, package_dir),
            PipelineStage::CopyBase => copy_base(ctx),
            PipelineStage::CopyOverlay => copy_overlays(ctx),
            PipelineStage::Persist => persist(&self.store, ctx).await,
            PipelineStage::BuildImage => {
                build_image(&self.container, ctx, &cfg.image_namespace, &cfg.manifest_file).await
            }
            PipelineStage::PlanBinds => Ok(plan_binds_stage(ctx, &cfg.layout, &cfg.execution_root)),
            PipelineStage::RewriteManifest => {
                let tag = ctx.image_tag
                             .clone()
                             .unwrap_or_else(|| image_tag(&cfg.image_namespace, &ctx.new_id));
                rewrite_manifest_stage(ctx, &cfg.manifest_file, &cfg.runner_prefix, &tag)
            }
        }
    }

    /// Best-effort: los fallos se registran y nunca reemplazan el error
    /// original.
    async fn compensate(&mut self, new_id: &str, package_dir: &Path, undo: Compensation) {
        let mut removed_dir = false;
        if undo.owns_dir {
            match fs::remove_dir_all(package_dir) {
                Ok(()) => {
                    removed_dir = true;
                    debug!("[{new_id}] removed {}", package_dir.display());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => error!("[{new_id}] could not remove {}: {e}", package_dir.display()),
            }
        }
        let mut record_removed = false;
        if undo.record_saved {
            match self.store.delete(new_id).await {
                Ok(existed) => record_removed = existed,
                Err(e) => error!("[{new_id}] could not delete saved record: {e}"),
            }
        }
        self.events.append_kind(new_id,
                                PipelineEventKind::CleanupPerformed { removed_dir,
                                                                      record_removed });
    }

    fn finalize(&mut self, ctx: PipelineContext) -> Result<PipelineOutcome, SubstitutionError> {
        let record = ctx.record.ok_or(SubstitutionError::IncompletePipeline("record"))?;
        let image_tag = ctx.image_tag.ok_or(SubstitutionError::IncompletePipeline("image tag"))?;
        let run_command = ctx.run_command.ok_or(SubstitutionError::IncompletePipeline("run command"))?;

        let binds: Vec<String> = ctx.bind_specs.iter().map(ToString::to_string).collect();
        let fingerprint = hash_value(&json!({
            "pipeline_version": PIPELINE_VERSION,
            "id": ctx.new_id,
            "substitution": ctx.substitution.to_json(),
            "image_tag": image_tag,
            "binds": binds,
        }));
        self.events.append_kind(&ctx.new_id,
                                PipelineEventKind::PipelineCompleted { fingerprint: fingerprint.clone() });
        info!("[{}] substitution finished, image {image_tag}", ctx.new_id);

        Ok(PipelineOutcome { id: ctx.new_id,
                             record,
                             image_tag,
                             bind_specs: ctx.bind_specs,
                             run_command,
                             fingerprint })
    }

    /// Arranca la imagen de un paquete ya sustituido con sus binds.
    pub async fn run_substituted(&self, outcome: &PipelineOutcome) -> Result<RunReport, SubstitutionError> {
        info!("[{}] starting container {}", outcome.id, outcome.image_tag);
        self.container
            .run(&outcome.image_tag, &outcome.bind_specs)
            .await
            .map_err(SubstitutionError::ContainerRunFailed)
    }
}

// Un id es un único segmento de ruta bajo la raíz de paquetes.
fn is_valid_package_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}
