//! Planificación de bind mounts para ejecutar el paquete sustituido.
//!
//! Primer bind: directorio de datos de la base (por id) en la raíz de
//! ejecución, lectura/escritura. Después, por entrada y en orden, el archivo
//! colocado en el directorio de trabajo sobre la ruta base, sólo lectura.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subst_domain::SubstitutionRequest;

use crate::layout::PackageLayout;
use crate::model::PipelineContext;
use crate::paths::{container_path, join_relative};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindSpec {
    pub host: PathBuf,
    pub container: String,
    pub mode: BindMode,
}

impl BindSpec {
    pub fn read_write(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self { host: host.into(),
               container: container.into(),
               mode: BindMode::ReadWrite }
    }

    pub fn read_only(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self { host: host.into(),
               container: container.into(),
               mode: BindMode::ReadOnly }
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == BindMode::ReadOnly
    }

    /// Flag para la línea de comandos: `-v host:container[:ro]`. Si la ruta
    /// contiene espacios el valor va entrecomillado para el shell.
    pub fn as_flag(&self) -> String {
        let spec = self.to_string();
        if !spec.contains(char::is_whitespace) {
            return format!("-v {spec}");
        }
        match shlex::try_quote(&spec) {
            Ok(quoted) => format!("-v {quoted}"),
            // Sólo falla con bytes nulos, que ninguna ruta puede contener.
            Err(_) => format!("-v {spec}"),
        }
    }
}

impl fmt::Display for BindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)?;
        if self.is_read_only() {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

/// Calcula los binds: siempre `1 + entradas`.
pub fn plan_binds(layout: &PackageLayout,
                  working_dir: &Path,
                  execution_root: &str,
                  request: &SubstitutionRequest)
                  -> Vec<BindSpec> {
    let mut binds = Vec::with_capacity(request.len() + 1);
    binds.push(BindSpec::read_write(layout.data_dir(request.base_id()), execution_root));
    for entry in request.entries() {
        binds.push(BindSpec::read_only(join_relative(working_dir, entry.placed_path()),
                                       container_path(execution_root, entry.base())));
    }
    binds
}

/// Etapa `PlanBinds`.
pub fn plan_binds_stage(mut ctx: PipelineContext, layout: &PackageLayout, execution_root: &str) -> PipelineContext {
    ctx.bind_specs = plan_binds(layout, &ctx.working_dir, execution_root, &ctx.substitution);
    log::debug!("[{}] planned {} bind mounts", ctx.new_id, ctx.bind_specs.len());
    ctx
}
