//! Validación de metadata: la base y el overlay deben existir en el store.
//!
//! Una sola consulta por identificador, sin reintentos. Un error del store se
//! trata igual que un registro inexistente.
use log::{debug, warn};
use serde_json::Value;

use crate::errors::SubstitutionError;
use crate::model::PipelineContext;
use crate::repo::PackageStore;

/// Devuelve la metadata del paquete base.
pub async fn fetch_base<S>(store: &S, base_id: &str) -> Result<Value, SubstitutionError>
    where S: PackageStore + ?Sized
{
    match store.find_by_id(base_id).await {
        Ok(Some(record)) => Ok(record.metadata),
        Ok(None) => Err(SubstitutionError::InvalidBase { id: base_id.to_string() }),
        Err(e) => {
            warn!("lookup of base {base_id} failed: {e}");
            Err(SubstitutionError::InvalidBase { id: base_id.to_string() })
        }
    }
}

pub async fn check_overlay_exists<S>(store: &S, overlay_id: &str) -> Result<(), SubstitutionError>
    where S: PackageStore + ?Sized
{
    match store.find_by_id(overlay_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(SubstitutionError::InvalidOverlay { id: overlay_id.to_string() }),
        Err(e) => {
            warn!("lookup of overlay {overlay_id} failed: {e}");
            Err(SubstitutionError::InvalidOverlay { id: overlay_id.to_string() })
        }
    }
}

/// Etapa `ValidateMetadata`: fija `base_metadata`.
pub async fn validate_metadata<S>(store: &S, mut ctx: PipelineContext) -> Result<PipelineContext, SubstitutionError>
    where S: PackageStore + ?Sized
{
    let metadata = fetch_base(store, ctx.substitution.base_id()).await?;
    debug!("[{}] found base compendium {}", ctx.new_id, ctx.substitution.base_id());
    ctx.base_metadata = Some(metadata);
    Ok(ctx)
}

/// Etapa `ValidateOverlay`.
pub async fn validate_overlay<S>(store: &S, ctx: PipelineContext) -> Result<PipelineContext, SubstitutionError>
    where S: PackageStore + ?Sized
{
    check_overlay_exists(store, ctx.substitution.overlay_id()).await?;
    debug!("[{}] found overlay compendium {}", ctx.new_id, ctx.substitution.overlay_id());
    Ok(ctx)
}
