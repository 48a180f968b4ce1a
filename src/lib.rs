//! substflow-rust: configuración y CLI que conectan el pipeline de sustitución
//! con Postgres y Docker.
pub mod cli;
pub mod config;

pub use config::{AppConfig, ConfigError};
