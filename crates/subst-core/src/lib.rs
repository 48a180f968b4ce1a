//! subst-core: pipeline de sustitución de compendios.
//!
//! Fusiona un paquete base y uno overlay en un paquete nuevo: valida ambos,
//! materializa el árbol fusionado, persiste el registro, construye la imagen,
//! planifica los binds y reescribe el manifest. Todo o nada.
pub mod binds;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod image;
pub mod layout;
pub mod manifest;
pub mod materialize;
pub mod model;
pub mod paths;
pub mod persist;
pub mod repo;
pub mod stage;
pub mod validate;

pub use binds::{plan_binds, BindMode, BindSpec};
pub use config::PipelineConfig;
pub use engine::{EngineBuilder, SubstitutionEngine};
pub use errors::{classify_error, ErrorClass, SubstitutionError};
pub use event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
pub use image::{image_tag, ContainerEngine, EngineError, RunReport};
pub use layout::PackageLayout;
pub use manifest::{run_command, ManifestFault};
pub use model::{PipelineContext, PipelineOutcome};
pub use repo::{InMemoryPackageStore, PackageStore, StoreError};
pub use stage::PipelineStage;

pub use subst_domain::{generate_package_id, EntryDraft, PackageRecord, SubstitutionDraft, SubstitutionEntry, SubstitutionRequest};
