//! Resolución de rutas de overlay y base (funciones puras, sin IO).
//!
//! Reglas de colocación de un archivo del overlay:
//! 1. Se quita *un* separador inicial (`/data/x.csv` -> `data/x.csv`).
//! 2. Se parte en `prefix` (directorio con `/` final, puede ser vacío) y
//!    `leaf` (último segmento).
//! 3. Si ya existe `working_dir/<overlay normalizado>` el destino es
//!    `prefix + "overlay_" + leaf` y se registra como `renamed_as`; si no, el
//!    destino es `prefix + leaf` sin renombrado.
//!
//! La comprobación de colisión usa la ruta declarada del overlay contra el
//! árbol ya fusionado, no el destino final; se conserva tal cual.
use std::path::{Path, PathBuf};

use crate::constants::OVERLAY_RENAME_PREFIX;

/// Quita un único `/` inicial.
pub fn normalize_overlay_path(raw: &str) -> &str {
    raw.strip_prefix('/').unwrap_or(raw)
}

/// Divide en (`prefix`, `leaf`). El prefix conserva el `/` final.
pub fn split_prefix_leaf(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Nombre sintético usado cuando hay colisión.
pub fn renamed_overlay_name(prefix: &str, leaf: &str) -> String {
    format!("{prefix}{OVERLAY_RENAME_PREFIX}{leaf}")
}

/// Une una ruta relativa declarada a una raíz del host ignorando separadores
/// iniciales (de lo contrario `Path::join` reemplazaría la raíz).
pub fn join_relative(root: &Path, rel: &str) -> PathBuf {
    root.join(rel.trim_start_matches('/'))
}

/// Ruta dentro del contenedor: `<execution_root>/<rel>` con un solo separador.
pub fn container_path(execution_root: &str, rel: &str) -> String {
    format!("{}/{}", execution_root.trim_end_matches('/'), rel.trim_start_matches('/'))
}

/// Resultado de resolver dónde se coloca un archivo del overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPlacement {
    /// Ruta declarada tras quitar el separador inicial.
    pub normalized: String,
    /// Destino relativo al directorio de trabajo.
    pub destination: String,
    /// Nombre sintético, sólo si hubo colisión.
    pub renamed_as: Option<String>,
}

/// Resuelve la colocación. `exists_in_tree` responde si una ruta relativa ya
/// existe en el árbol fusionado.
pub fn resolve_overlay_placement<F>(raw_overlay: &str, exists_in_tree: F) -> OverlayPlacement
    where F: FnOnce(&str) -> bool
{
    let normalized = normalize_overlay_path(raw_overlay);
    let (prefix, leaf) = split_prefix_leaf(normalized);
    if exists_in_tree(normalized) {
        let renamed = renamed_overlay_name(prefix, leaf);
        OverlayPlacement { normalized: normalized.to_string(),
                           destination: renamed.clone(),
                           renamed_as: Some(renamed) }
    } else {
        OverlayPlacement { normalized: normalized.to_string(),
                           destination: format!("{prefix}{leaf}"),
                           renamed_as: None }
    }
}
