use std::collections::HashMap;

use chrono::Utc;

use super::{PipelineEvent, PipelineEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con
    /// seq y ts).
    fn append_kind(&mut self, run_id: &str, kind: PipelineEventKind) -> PipelineEvent;
    /// Eventos de una ejecución en orden ascendente de seq.
    fn list(&self, run_id: &str) -> Vec<PipelineEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: HashMap<String, Vec<PipelineEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: &str, kind: PipelineEventKind) -> PipelineEvent {
        let events = self.inner.entry(run_id.to_string()).or_default();
        let ev = PipelineEvent { seq: events.len() as u64,
                                 run_id: run_id.to_string(),
                                 kind,
                                 ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, run_id: &str) -> Vec<PipelineEvent> {
        self.inner.get(run_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::PipelineStage;

    #[test]
    fn sequences_are_per_run() {
        let mut store = InMemoryEventStore::default();
        store.append_kind("a", PipelineEventKind::StageStarted { stage: PipelineStage::ValidateMetadata });
        let second = store.append_kind("a", PipelineEventKind::StageFinished { stage: PipelineStage::ValidateMetadata });
        let other = store.append_kind("b", PipelineEventKind::StageStarted { stage: PipelineStage::ValidateMetadata });
        assert_eq!(second.seq, 1);
        assert_eq!(other.seq, 0);
        assert_eq!(store.list("a").len(), 2);
        assert!(store.list("missing").is_empty());
    }
}
