//! Orquestador del pipeline de sustitución.

pub mod builder;
pub mod core;

pub use builder::EngineBuilder;
pub use core::SubstitutionEngine;
