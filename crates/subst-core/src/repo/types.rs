//! Store de documentos de paquetes (interfaz inyectada).
//!
//! El pipeline sólo necesita `find_by_id` y `save`; `delete` existe para la
//! compensación cuando una etapa posterior a `Persist` falla.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use subst_domain::PackageRecord;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store error: {0}")]
    Other(String),
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Busca un registro por identificador. `Ok(None)` si no existe.
    async fn find_by_id(&self, id: &str) -> Result<Option<PackageRecord>, StoreError>;
    /// Guarda un registro nuevo. Un id repetido es `StoreError::Conflict`.
    async fn save(&self, record: PackageRecord) -> Result<(), StoreError>;
    /// Elimina un registro; devuelve si existía.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Implementación en memoria. Clonable: los clones comparten el mismo mapa,
/// lo que permite inspeccionarlo desde los tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPackageStore {
    inner: Arc<RwLock<HashMap<String, PackageRecord>>>,
}

impl InMemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta (o reemplaza) sin comprobar unicidad; útil para sembrar paquetes
    /// publicados.
    pub async fn insert(&self, record: PackageRecord) {
        self.inner.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl PackageStore for InMemoryPackageStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<PackageRecord>, StoreError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn save(&self, record: PackageRecord) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id));
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.remove(id).is_some())
    }
}
