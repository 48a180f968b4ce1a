//! Constantes del pipeline de sustitución.
//!
//! Los valores por defecto de `PipelineConfig` salen de aquí; la versión del
//! pipeline entra en el fingerprint de cada ejecución.

/// Versión lógica del pipeline. Forma parte del fingerprint de la ejecución.
pub const PIPELINE_VERSION: &str = "S1.0";

/// Subdirectorio de datos dentro de cada paquete (`<root>/<id>/data`).
pub const DATA_DIR: &str = "data";

/// Manifest de ejecución, relativo al directorio de datos.
pub const DEFAULT_MANIFEST_FILE: &str = "erc.yml";

/// Raíz de ejecución dentro del contenedor.
pub const DEFAULT_EXECUTION_ROOT: &str = "/erc";

pub const DEFAULT_IMAGE_NAMESPACE: &str = "bagtainer";

/// Prefijo del nombre de imagen antes del identificador del paquete.
pub const IMAGE_NAME_PREFIX: &str = "subst";

/// Prefijo del nombre sintético cuando un archivo del overlay colisiona.
pub const OVERLAY_RENAME_PREFIX: &str = "overlay_";

pub const DEFAULT_RUNNER_PREFIX: &str = "docker run -it --rm";

pub const DOCKERFILE: &str = "Dockerfile";
