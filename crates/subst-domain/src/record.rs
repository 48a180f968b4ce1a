//! Registro persistido de un paquete derivado.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SubstitutionRequest;

/// `{id, owner, metadata}` tal como lo guarda el store de documentos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: String,
    pub owner: String,
    pub metadata: Value,
}

impl PackageRecord {
    /// Construye el registro del paquete sustituido: copia de la metadata de
    /// la base con `substituted` y `substitution` sobrescritos.
    pub fn substituted(id: &str, owner: &str, base_metadata: &Value, request: &SubstitutionRequest) -> Self {
        Self { id: id.to_string(),
               owner: owner.to_string(),
               metadata: merge_metadata(base_metadata, request) }
    }

    pub fn is_substituted(&self) -> bool {
        self.metadata.get("substituted").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Reconstruye el descriptor guardado, si existe y es válido.
    pub fn substitution(&self) -> Option<SubstitutionRequest> {
        let raw = self.metadata.get("substitution")?.clone();
        serde_json::from_value(raw).ok()
    }
}

/// Fusiona la metadata de la base con el descriptor de sustitución. Si la
/// metadata de la base no es un objeto se parte de un objeto vacío.
pub fn merge_metadata(base_metadata: &Value, request: &SubstitutionRequest) -> Value {
    let mut merged = match base_metadata {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    merged.insert("substituted".to_string(), Value::Bool(true));
    merged.insert("substitution".to_string(), request.to_json());
    Value::Object(merged)
}
