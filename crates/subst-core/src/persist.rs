//! Persistencia del registro del paquete sustituido.
use log::{error, info};
use serde_json::Value;
use subst_domain::PackageRecord;

use crate::errors::SubstitutionError;
use crate::model::PipelineContext;
use crate::repo::PackageStore;

/// Etapa `Persist`: metadata de la base + descriptor de sustitución (con los
/// `renamedAs` ya resueltos), guardado una única vez.
pub async fn persist<S>(store: &S, mut ctx: PipelineContext) -> Result<PipelineContext, SubstitutionError>
    where S: PackageStore + ?Sized
{
    let base_metadata = ctx.base_metadata.clone().unwrap_or(Value::Null);
    let record = PackageRecord::substituted(&ctx.new_id, &ctx.requesting_user, &base_metadata, &ctx.substitution);
    if let Err(e) = store.save(record.clone()).await {
        error!("[{}] could not save record: {e}", ctx.new_id);
        return Err(SubstitutionError::PersistenceFailed(e));
    }
    info!("[{}] saved substituted compendium for {}", ctx.new_id, ctx.requesting_user);
    ctx.record = Some(record);
    Ok(ctx)
}
