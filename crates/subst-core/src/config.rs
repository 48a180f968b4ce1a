//! Configuración del pipeline (independiente de cómo se cargue: env, tests...).
use std::path::PathBuf;

use crate::constants::{DEFAULT_EXECUTION_ROOT, DEFAULT_IMAGE_NAMESPACE, DEFAULT_MANIFEST_FILE, DEFAULT_RUNNER_PREFIX};
use crate::layout::PackageLayout;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ubicación de los paquetes publicados y de los nuevos.
    pub layout: PackageLayout,
    /// Namespace (repositorio) de las imágenes construidas.
    pub image_namespace: String,
    /// Raíz de ejecución dentro del contenedor.
    pub execution_root: String,
    /// Nombre del manifest, relativo al directorio de datos.
    pub manifest_file: String,
    /// Comando base con el que se arranca el contenedor.
    pub runner_prefix: String,
}

impl PipelineConfig {
    pub fn new(packages_root: impl Into<PathBuf>) -> Self {
        Self { layout: PackageLayout::new(packages_root),
               image_namespace: DEFAULT_IMAGE_NAMESPACE.to_string(),
               execution_root: DEFAULT_EXECUTION_ROOT.to_string(),
               manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
               runner_prefix: DEFAULT_RUNNER_PREFIX.to_string() }
    }

    pub fn with_image_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.image_namespace = namespace.into();
        self
    }

    pub fn with_execution_root(mut self, root: impl Into<String>) -> Self {
        self.execution_root = root.into();
        self
    }

    pub fn with_manifest_file(mut self, file: impl Into<String>) -> Self {
        self.manifest_file = file.into();
        self
    }

    pub fn with_runner_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.runner_prefix = prefix.into();
        self
    }
}
