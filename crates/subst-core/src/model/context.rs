use std::path::PathBuf;

use serde_json::Value;
use subst_domain::{PackageRecord, SubstitutionRequest};

use crate::binds::BindSpec;
use crate::layout::PackageLayout;

/// Contexto único de una ejecución del pipeline.
///
/// Lo crea el orquestador y se mueve de etapa en etapa: cada etapa lo recibe
/// por valor, lo completa y lo devuelve (o falla y lo descarta). Nunca se
/// comparte entre ejecuciones.
#[derive(Debug)]
pub struct PipelineContext {
    pub new_id: String,
    pub requesting_user: String,
    pub substitution: SubstitutionRequest,
    /// Metadata de la base (la fija `ValidateMetadata`).
    pub base_metadata: Option<Value>,
    /// Directorio de datos del paquete nuevo.
    pub working_dir: PathBuf,
    pub base_dir: PathBuf,
    pub overlay_dir: PathBuf,
    pub image_tag: Option<String>,
    pub bind_specs: Vec<BindSpec>,
    /// Registro guardado en `Persist`.
    pub record: Option<PackageRecord>,
    pub run_command: Option<String>,
}

impl PipelineContext {
    /// Las rutas se derivan de los identificadores; crear el directorio de
    /// trabajo es tarea de la etapa `CreateWorkingDir`.
    pub fn new(new_id: &str, requesting_user: &str, substitution: SubstitutionRequest, layout: &PackageLayout) -> Self {
        let working_dir = layout.data_dir(new_id);
        let base_dir = layout.data_dir(substitution.base_id());
        let overlay_dir = layout.data_dir(substitution.overlay_id());
        Self { new_id: new_id.to_string(),
               requesting_user: requesting_user.to_string(),
               substitution,
               base_metadata: None,
               working_dir,
               base_dir,
               overlay_dir,
               image_tag: None,
               bind_specs: Vec::new(),
               record: None,
               run_command: None }
    }
}
