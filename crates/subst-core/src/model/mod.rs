//! Modelos del pipeline (contexto de ejecución y resultado).

pub mod context;
pub mod outcome;

pub use context::PipelineContext;
pub use outcome::PipelineOutcome;
