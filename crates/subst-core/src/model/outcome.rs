use serde::Serialize;
use subst_domain::PackageRecord;

use crate::binds::BindSpec;

/// Resultado de una ejecución completa: sólo existe si todas las etapas
/// terminaron bien.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub id: String,
    pub record: PackageRecord,
    pub image_tag: String,
    pub bind_specs: Vec<BindSpec>,
    pub run_command: String,
    /// Hash del descriptor final + imagen + binds.
    pub fingerprint: String,
}
