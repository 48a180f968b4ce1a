use thiserror::Error;

/// Errores de forma de una solicitud de sustitución.
///
/// Se detectan antes de tocar el sistema de archivos; el core los traduce a
/// su propia taxonomía.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("base ID is invalid")]
    MissingBaseId,
    #[error("overlay ID is invalid")]
    MissingOverlayId,
    #[error("substitution files missing")]
    SubstitutionFilesMissing,
    #[error("substitution base file does not exist (entry {0})")]
    BaseFileFieldMissing(usize),
    #[error("substitution overlay file does not exist (entry {0})")]
    OverlayFileFieldMissing(usize),
    #[error("path escapes package root: {0}")]
    PathEscapesPackage(String),
}
