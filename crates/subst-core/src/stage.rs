//! Etapas del pipeline, en el orden fijo en que se ejecutan.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ValidateMetadata,
    ValidateOverlay,
    CreateWorkingDir,
    /// Incluye la validación de entradas contra el árbol de la base.
    CopyBase,
    CopyOverlay,
    Persist,
    BuildImage,
    PlanBinds,
    RewriteManifest,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 9] = [PipelineStage::ValidateMetadata,
                                           PipelineStage::ValidateOverlay,
                                           PipelineStage::CreateWorkingDir,
                                           PipelineStage::CopyBase,
                                           PipelineStage::CopyOverlay,
                                           PipelineStage::Persist,
                                           PipelineStage::BuildImage,
                                           PipelineStage::PlanBinds,
                                           PipelineStage::RewriteManifest];

    pub fn id(self) -> &'static str {
        match self {
            PipelineStage::ValidateMetadata => "validate_metadata",
            PipelineStage::ValidateOverlay => "validate_overlay",
            PipelineStage::CreateWorkingDir => "create_working_dir",
            PipelineStage::CopyBase => "copy_base",
            PipelineStage::CopyOverlay => "copy_overlay",
            PipelineStage::Persist => "persist",
            PipelineStage::BuildImage => "build_image",
            PipelineStage::PlanBinds => "plan_binds",
            PipelineStage::RewriteManifest => "rewrite_manifest",
        }
    }

    /// Un fallo en esta etapa exige borrar el directorio del paquete nuevo.
    pub fn requires_cleanup(self) -> bool {
        self >= PipelineStage::CreateWorkingDir
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_sorted_and_cleanup_starts_at_working_dir() {
        let mut sorted = PipelineStage::ORDER;
        sorted.sort();
        assert_eq!(sorted, PipelineStage::ORDER);
        assert!(!PipelineStage::ValidateOverlay.requires_cleanup());
        assert!(PipelineStage::CreateWorkingDir.requires_cleanup());
    }
}
