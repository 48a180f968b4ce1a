//! Implementación Postgres (Diesel) de `PackageStore`.
//!
//! - Una fila por paquete en `compendia`; `metadata` se guarda como JSONB.
//! - Diesel es bloqueante: cada operación corre en
//!   `tokio::task::spawn_blocking` con su propia conexión del pool.
//! - `find_by_id` y `save` se intentan una sola vez: reintentar un INSERT que
//!   ya se confirmó lo convertiría en un `Conflict` sobre el registro propio.
//!   Sólo `delete` (compensación, idempotente) reintenta con backoff corto.
//! - Una violación de unicidad al guardar es `StoreError::Conflict`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use serde_json::Value;
use subst_core::{PackageStore, StoreError};
use subst_domain::PackageRecord;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::compendia;

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las migraciones
/// pendientes.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real en producción, otro en tests).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Queryable, Debug)]
pub struct CompendiumRow {
    pub id: String,
    pub owner: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl From<CompendiumRow> for PackageRecord {
    fn from(row: CompendiumRow) -> Self {
        PackageRecord { id: row.id,
                        owner: row.owner,
                        metadata: row.metadata }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = compendia)]
pub struct NewCompendiumRow<'a> {
    pub id: &'a str,
    pub owner: &'a str,
    pub metadata: &'a Value,
}

/// Hasta 3 reintentos: 15ms, 30ms, 45ms.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

pub struct PgPackageStore<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> Clone for PgPackageStore<P> {
    fn clone(&self) -> Self {
        Self { provider: Arc::clone(&self.provider) }
    }
}

impl<P: ConnectionProvider> PgPackageStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    // Ejecuta `f` con una conexión en el pool de tareas bloqueantes.
    async fn blocking<F, T>(&self, f: F) -> Result<T, PersistenceError>
        where F: FnOnce(&P) -> Result<T, PersistenceError> + Send + 'static,
              T: Send + 'static
    {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || f(&provider)).await
                                                         .map_err(|e| PersistenceError::Unknown(format!("blocking task failed: {e}")))?
    }
}

impl PgPackageStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

#[async_trait]
impl<P: ConnectionProvider> PackageStore for PgPackageStore<P> {
    async fn find_by_id(&self, id: &str) -> Result<Option<PackageRecord>, StoreError> {
        let id = id.to_string();
        debug!("find_by_id:start id={id}");
        let row = self.blocking(move |provider| {
                          let mut conn = provider.connection()?;
                          compendia::table.find(&id)
                                          .first::<CompendiumRow>(&mut conn)
                                          .optional()
                                          .map_err(PersistenceError::from)
                      })
                      .await?;
        Ok(row.map(PackageRecord::from))
    }

    async fn save(&self, record: PackageRecord) -> Result<(), StoreError> {
        let id = record.id.clone();
        let result = self.blocking(move |provider| {
                             let mut conn = provider.connection()?;
                             diesel::insert_into(compendia::table).values(NewCompendiumRow { id: &record.id,
                                                                                             owner: &record.owner,
                                                                                             metadata: &record.metadata })
                                                                  .execute(&mut conn)
                                                                  .map_err(PersistenceError::from)
                         })
                         .await;
        match result {
            Ok(_) => {
                debug!("save:done id={id}");
                Ok(())
            }
            Err(PersistenceError::UniqueViolation(_)) => Err(StoreError::Conflict(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Borrar es idempotente, así que los errores transitorios se reintentan
    /// (`with_retry`); la compensación no debe dejar registros por un corte
    /// momentáneo.
    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        let removed = self.blocking(move |provider| {
                              with_retry(|| {
                                  let mut conn = provider.connection()?;
                                  diesel::delete(compendia::table.find(&id)).execute(&mut conn)
                                                                            .map_err(PersistenceError::from)
                              })
                          })
                          .await?;
        Ok(removed > 0)
    }
}

/// Construye un pool r2d2 y corre las migraciones pendientes.
///
/// Si `min_size > max_size` se usa `min_size = max_size`; tamaños 0 se elevan
/// a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1);
    if min > max {
        warn!("min_size > max_size ({min} > {max}), using min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min.min(max)))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

