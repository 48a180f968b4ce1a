//! Tipos de evento de una ejecución del pipeline.
//!
//! Cada ejecución emite, en orden: `PipelineInitialized`, un par
//! `StageStarted`/`StageFinished` por etapa completada y, al final,
//! `PipelineCompleted` o bien `StageFailed` seguido de `CleanupPerformed`
//! (sólo si la etapa fallida exigía limpieza).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ErrorClass;
use crate::stage::PipelineStage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEventKind {
    /// Primer evento de un `run_id`.
    PipelineInitialized {
        base_id: String,
        overlay_id: String,
        entry_count: usize,
    },
    StageStarted { stage: PipelineStage },
    StageFinished { stage: PipelineStage },
    /// Error terminal; no se ejecutan más etapas.
    StageFailed {
        stage: PipelineStage,
        error: String,
        class: ErrorClass,
    },
    /// Resultado de la compensación (best-effort).
    CleanupPerformed { removed_dir: bool, record_removed: bool },
    PipelineCompleted { fingerprint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub seq: u64,
    /// Identificador del paquete nuevo.
    pub run_id: String,
    pub kind: PipelineEventKind,
    pub ts: DateTime<Utc>, // metadato, no entra en el fingerprint
}
