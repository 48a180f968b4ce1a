//! Solicitud de sustitución: borrador externo y versión validada.
//!
//! El borrador (`SubstitutionDraft`) acepta lo que llegue por la frontera
//! (campos ausentes, tipos incorrectos). `validate` lo convierte en un
//! `SubstitutionRequest` cuyas invariantes ya no hace falta comprobar:
//! - identificadores `base`/`overlay` presentes y no vacíos;
//! - `substitutionFiles` no vacío;
//! - cada entrada con `base` y `overlay` de tipo string no vacío;
//! - ninguna ruta con componentes `..`.
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::DomainError;

/// Entrada cruda. `base`/`overlay` se guardan como JSON arbitrario para
/// distinguir "ausente" de "tipo incorrecto" sin fallar la deserialización.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[serde(default)]
    pub base: Option<Value>,
    #[serde(default)]
    pub overlay: Option<Value>,
    #[serde(default, alias = "filename", skip_serializing_if = "Option::is_none")]
    pub renamed_as: Option<String>,
}

impl EntryDraft {
    pub fn new(base: &str, overlay: &str) -> Self {
        Self { base: Some(Value::String(base.to_string())),
               overlay: Some(Value::String(overlay.to_string())),
               renamed_as: None }
    }
}

/// Borrador de solicitud tal como lo entrega la capa HTTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionDraft {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub overlay: Option<String>,
    #[serde(default)]
    pub substitution_files: Option<Vec<EntryDraft>>,
}

impl SubstitutionDraft {
    pub fn new(base: &str, overlay: &str, files: Vec<EntryDraft>) -> Self {
        Self { base: Some(base.to_string()),
               overlay: Some(overlay.to_string()),
               substitution_files: Some(files) }
    }

    /// Valida el borrador completo. Una sola entrada inválida invalida toda la
    /// solicitud; el error indica el índice de la primera entrada rechazada.
    pub fn validate(self) -> Result<SubstitutionRequest, DomainError> {
        let base = non_empty(self.base).ok_or(DomainError::MissingBaseId)?;
        let overlay = non_empty(self.overlay).ok_or(DomainError::MissingOverlayId)?;
        let drafts = match self.substitution_files {
            Some(files) if !files.is_empty() => files,
            _ => return Err(DomainError::SubstitutionFilesMissing),
        };

        let mut entries = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.into_iter().enumerate() {
            let base_file = string_field(draft.base).ok_or(DomainError::BaseFileFieldMissing(index))?;
            let overlay_file = string_field(draft.overlay).ok_or(DomainError::OverlayFileFieldMissing(index))?;
            ensure_contained(&base_file)?;
            ensure_contained(&overlay_file)?;
            entries.push(SubstitutionEntry { base: base_file,
                                             overlay: overlay_file,
                                             renamed_as: draft.renamed_as });
        }
        Ok(SubstitutionRequest { base, overlay, entries })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// Sólo strings no vacíos; números, objetos o null cuentan como ausentes.
fn string_field(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn ensure_contained(path: &str) -> Result<(), DomainError> {
    if Path::new(path).components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(DomainError::PathEscapesPackage(path.to_string()));
    }
    Ok(())
}

/// Par declarado (ruta en la base, ruta en el overlay).
///
/// `renamed_as` sólo se rellena durante la materialización, cuando el archivo
/// del overlay colisiona con uno ya presente en el árbol fusionado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionEntry {
    base: String,
    overlay: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    renamed_as: Option<String>,
}

impl SubstitutionEntry {
    pub fn base(&self) -> &str { &self.base }
    pub fn overlay(&self) -> &str { &self.overlay }
    pub fn renamed_as(&self) -> Option<&str> { self.renamed_as.as_deref() }

    /// Ruta (relativa al directorio de trabajo) donde quedó el archivo del
    /// overlay: el nombre sintético si hubo colisión, si no la ruta declarada.
    pub fn placed_path(&self) -> &str {
        self.renamed_as.as_deref().unwrap_or(&self.overlay)
    }

    /// Fija la ruta normalizada del overlay y, si hubo colisión, el nombre
    /// sintético. Rutas vacías se ignoran para no romper la invariante.
    pub fn record_placement(&mut self, normalized_overlay: String, renamed_as: Option<String>) {
        if !normalized_overlay.is_empty() {
            self.overlay = normalized_overlay;
        }
        self.renamed_as = renamed_as.filter(|r| !r.is_empty());
    }
}

/// Solicitud validada. Se deserializa pasando siempre por `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubstitutionDraft")]
pub struct SubstitutionRequest {
    base: String,
    overlay: String,
    #[serde(rename = "substitutionFiles")]
    entries: Vec<SubstitutionEntry>,
}

impl TryFrom<SubstitutionDraft> for SubstitutionRequest {
    type Error = DomainError;

    fn try_from(draft: SubstitutionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl SubstitutionRequest {
    /// Atajo para llamadas programáticas con pares `(base, overlay)`.
    pub fn new(base: &str, overlay: &str, files: &[(&str, &str)]) -> Result<Self, DomainError> {
        let drafts = files.iter().map(|(b, o)| EntryDraft::new(b, o)).collect();
        SubstitutionDraft::new(base, overlay, drafts).validate()
    }

    pub fn base_id(&self) -> &str { &self.base }
    pub fn overlay_id(&self) -> &str { &self.overlay }
    pub fn entries(&self) -> &[SubstitutionEntry] { &self.entries }
    pub fn entries_mut(&mut self) -> &mut [SubstitutionEntry] { &mut self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Descriptor JSON tal como se guarda en `metadata.substitution`.
    pub fn to_json(&self) -> Value {
        let files: Vec<Value> = self.entries
                                    .iter()
                                    .map(|e| {
                                        let mut v = json!({ "base": e.base, "overlay": e.overlay });
                                        if let Some(r) = &e.renamed_as {
                                            v["renamedAs"] = json!(r);
                                        }
                                        v
                                    })
                                    .collect();
        json!({
            "base": self.base,
            "overlay": self.overlay,
            "substitutionFiles": files,
        })
    }
}
