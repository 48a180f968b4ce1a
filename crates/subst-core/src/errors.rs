//! Taxonomía de errores del pipeline de sustitución.
//!
//! Cada etapa reporta un `SubstitutionError`; el orquestador lo propaga sin
//! modificar tras ejecutar la limpieza. `classify_error` y `status_code` dan la
//! clase y el código HTTP equivalente para la capa que atiende la petición.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use subst_domain::DomainError;
use thiserror::Error;

use crate::image::EngineError;
use crate::manifest::ManifestFault;
use crate::repo::StoreError;

#[derive(Debug, Error)]
pub enum SubstitutionError {
    #[error("base ID is invalid")]
    InvalidBase { id: String },
    #[error("overlay ID is invalid")]
    InvalidOverlay { id: String },
    #[error("substitution files missing")]
    SubstitutionFilesMissing,
    #[error("substitution base file does not exist (entry {index})")]
    BaseFileFieldMissing { index: usize },
    #[error("substitution overlay file does not exist (entry {index})")]
    OverlayFileFieldMissing { index: usize },
    #[error("path escapes package root: {path}")]
    PathEscapesPackage { path: String },
    #[error("base file does not exist: {path}")]
    BaseFileNotFound { path: String },
    #[error("overlay file does not exist: {path}")]
    OverlayFileNotFound { path: String },
    #[error("could not create directory for new compendium {}: {source}", path.display())]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },
    #[error("could not copy base files: {source}")]
    BaseCopyFailed { source: io::Error },
    #[error("could not copy overlay file {path}: {source}")]
    OverlayCopyFailed { path: String, source: io::Error },
    #[error("image build failed: {0}")]
    ImageBuildFailed(#[source] EngineError),
    #[error("could not write manifest {}: {fault}", path.display())]
    ManifestWriteFailed {
        path: PathBuf,
        #[source]
        fault: ManifestFault,
    },
    #[error("internal error: {0}")]
    PersistenceFailed(#[source] StoreError),
    #[error("container run failed: {0}")]
    ContainerRunFailed(#[source] EngineError),
    #[error("internal error: pipeline finished without {0}")]
    IncompletePipeline(&'static str),
}

impl From<DomainError> for SubstitutionError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::MissingBaseId => Self::InvalidBase { id: String::new() },
            DomainError::MissingOverlayId => Self::InvalidOverlay { id: String::new() },
            DomainError::SubstitutionFilesMissing => Self::SubstitutionFilesMissing,
            DomainError::BaseFileFieldMissing(index) => Self::BaseFileFieldMissing { index },
            DomainError::OverlayFileFieldMissing(index) => Self::OverlayFileFieldMissing { index },
            DomainError::PathEscapesPackage(path) => Self::PathEscapesPackage { path },
        }
    }
}

/// Clase de error: decide código de salida/HTTP y severidad del log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Entrada del usuario inválida (400).
    UserInput,
    /// Fallo operacional atribuible a la entrada (400).
    Operational,
    /// Sistema de archivos / engine no disponibles (500).
    Unavailable,
    /// Error interno, p.ej. persistencia (500).
    Internal,
}

pub fn classify_error(e: &SubstitutionError) -> ErrorClass {
    use SubstitutionError::*;
    match e {
        InvalidBase { .. }
        | InvalidOverlay { .. }
        | SubstitutionFilesMissing
        | BaseFileFieldMissing { .. }
        | OverlayFileFieldMissing { .. }
        | PathEscapesPackage { .. }
        | BaseFileNotFound { .. }
        | OverlayFileNotFound { .. } => ErrorClass::UserInput,
        // Un fallo al copiar la base se responde como 400.
        BaseCopyFailed { .. } => ErrorClass::Operational,
        DirectoryCreateFailed { .. } | OverlayCopyFailed { .. } => ErrorClass::Unavailable,
        ImageBuildFailed(err) | ContainerRunFailed(err) => {
            if err.is_unavailable() {
                ErrorClass::Unavailable
            } else {
                ErrorClass::Operational
            }
        }
        ManifestWriteFailed { fault, .. } => {
            if fault.is_unavailable() {
                ErrorClass::Unavailable
            } else {
                ErrorClass::Operational
            }
        }
        PersistenceFailed(_) | IncompletePipeline(_) => ErrorClass::Internal,
    }
}

impl SubstitutionError {
    pub fn class(&self) -> ErrorClass {
        classify_error(self)
    }

    /// Código HTTP equivalente.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::UserInput | ErrorClass::Operational => 400,
            ErrorClass::Unavailable | ErrorClass::Internal => 500,
        }
    }
}
