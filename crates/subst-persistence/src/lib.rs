//! subst-persistence
//!
//! Store de paquetes sobre Postgres (Diesel + r2d2) para el pipeline de
//! sustitución.
//!
//! Módulos:
//! - `pg`: `PgPackageStore` y utilidades de pool.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::DbConfig;
pub use error::PersistenceError;
pub use pg::{build_pool, ConnectionProvider, PgPackageStore, PgPool, PoolProvider};
