//! Builder para `SubstitutionEngine`.
//!
//! Store y engine de contenedores son obligatorios; el event store por defecto
//! es `InMemoryEventStore` y puede reemplazarse antes de `build`.
use crate::config::PipelineConfig;
use crate::engine::SubstitutionEngine;
use crate::event::{EventStore, InMemoryEventStore};
use crate::image::ContainerEngine;
use crate::repo::PackageStore;

#[derive(Debug)]
pub struct EngineBuilder<S, C, E = InMemoryEventStore> {
    pub(crate) config: PipelineConfig,
    pub(crate) store: S,
    pub(crate) container: C,
    pub(crate) events: E,
}

impl<S, C, E> EngineBuilder<S, C, E>
    where S: PackageStore,
          C: ContainerEngine,
          E: EventStore
{
    /// Reemplaza el event store.
    pub fn event_store<E2: EventStore>(self, events: E2) -> EngineBuilder<S, C, E2> {
        EngineBuilder { config: self.config,
                        store: self.store,
                        container: self.container,
                        events }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SubstitutionEngine<S, C, E> {
        SubstitutionEngine::from_parts(self.config, self.store, self.container, self.events)
    }
}
