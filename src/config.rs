//! Configuración central de la aplicación.
//! Carga variables de entorno (.env una sola vez) y produce la configuración
//! del pipeline y, si hay `DATABASE_URL`, la de la base de datos.
use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use subst_core::constants::{DEFAULT_EXECUTION_ROOT, DEFAULT_IMAGE_NAMESPACE, DEFAULT_MANIFEST_FILE};
use subst_core::PipelineConfig;
use subst_engine::DEFAULT_DOCKER_BIN;
use subst_persistence::config::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS};
use subst_persistence::DbConfig;
use thiserror::Error;

pub const DEFAULT_PACKAGES_ROOT: &str = "/tmp/o2r/compendium";

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: String, value: String },
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub packages_root: PathBuf,
    pub image_namespace: String,
    pub execution_root: String,
    pub manifest_file: String,
    pub docker_bin: String,
    /// `None` si `DATABASE_URL` no está definido.
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let text = |key: &str, default: &str| lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u32| -> Result<u32, ConfigError> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber { var: key.to_string(),
                                                                                         value: raw.clone() }),
                None => Ok(default),
            }
        };

        let database = match lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => Some(DbConfig { url,
                                         min_connections: number("DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS)?,
                                         max_connections: number("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)? }),
            None => None,
        };
        Ok(Self { packages_root: PathBuf::from(text("SUBST_PACKAGES_ROOT", DEFAULT_PACKAGES_ROOT)),
                  image_namespace: text("SUBST_IMAGE_NAMESPACE", DEFAULT_IMAGE_NAMESPACE),
                  execution_root: text("SUBST_EXECUTION_ROOT", DEFAULT_EXECUTION_ROOT),
                  manifest_file: text("SUBST_MANIFEST_FILE", DEFAULT_MANIFEST_FILE),
                  docker_bin: text("SUBST_DOCKER_BIN", DEFAULT_DOCKER_BIN),
                  database })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.packages_root).with_image_namespace(&self.image_namespace)
                                                .with_execution_root(&self.execution_root)
                                                .with_manifest_file(&self.manifest_file)
    }

    pub fn require_database(&self) -> Result<&DbConfig, ConfigError> {
        self.database.as_ref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.packages_root, PathBuf::from("/tmp/o2r/compendium"));
        assert_eq!(cfg.image_namespace, "bagtainer");
        assert_eq!(cfg.execution_root, "/erc");
        assert_eq!(cfg.manifest_file, "erc.yml");
        assert_eq!(cfg.docker_bin, "docker");
        assert!(cfg.database.is_none());
        assert_eq!(cfg.require_database(), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn overrides_flow_into_pipeline_config() {
        let cfg = AppConfig::from_lookup(lookup(&[("SUBST_PACKAGES_ROOT", "/srv/c"),
                                                  ("SUBST_IMAGE_NAMESPACE", "erc"),
                                                  ("DATABASE_URL", "postgres://x"),
                                                  ("DATABASE_MAX_CONNECTIONS", "4")])).unwrap();
        let db = cfg.require_database().unwrap();
        assert_eq!(db.max_connections, 4);
        assert_eq!(db.min_connections, 2);
        let pipeline = cfg.pipeline_config();
        assert_eq!(pipeline.layout.data_dir("a"), PathBuf::from("/srv/c/a/data"));
        assert_eq!(pipeline.image_namespace, "erc");
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("DATABASE_MIN_CONNECTIONS", "two")]))
            .unwrap_err();
        assert_eq!(err,
                   ConfigError::InvalidNumber { var: "DATABASE_MIN_CONNECTIONS".into(),
                                                value: "two".into() });
    }
}
