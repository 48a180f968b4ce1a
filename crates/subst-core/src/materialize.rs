//! Materialización del paquete nuevo: directorio de trabajo, copia de la base
//! y colocación de cada archivo del overlay.
use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use walkdir::WalkDir;

use crate::errors::SubstitutionError;
use crate::model::PipelineContext;
use crate::paths::{join_relative, resolve_overlay_placement};

/// Copia recursiva de `src` dentro de `dst` (que puede existir ya). Los
/// enlaces simbólicos se recrean como enlaces, sin seguirlos.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

// Sin enlaces simbólicos portables se copia el contenido del archivo.
#[cfg(not(unix))]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

/// Etapa `CreateWorkingDir`. El directorio del paquete no debe existir: otro
/// paquete con el mismo id nunca se pisa.
pub fn create_working_dir(ctx: PipelineContext, package_dir: &Path) -> Result<PipelineContext, SubstitutionError> {
    let failed = |source: io::Error| SubstitutionError::DirectoryCreateFailed { path: package_dir.to_path_buf(),
                                                                                source };
    if let Some(root) = package_dir.parent() {
        fs::create_dir_all(root).map_err(failed)?;
    }
    fs::create_dir(package_dir).map_err(failed)?;
    fs::create_dir_all(&ctx.working_dir).map_err(|source| SubstitutionError::DirectoryCreateFailed { path: ctx.working_dir.clone(),
                                                                                                       source })?;
    debug!("[{}] created working directory {}", ctx.new_id, ctx.working_dir.display());
    Ok(ctx)
}

/// Etapa `CopyBase`: todas las rutas base declaradas deben existir antes de
/// copiar nada; después se copia el árbol completo de la base.
pub fn copy_base(ctx: PipelineContext) -> Result<PipelineContext, SubstitutionError> {
    for entry in ctx.substitution.entries() {
        if !join_relative(&ctx.base_dir, entry.base()).exists() {
            return Err(SubstitutionError::BaseFileNotFound { path: entry.base().to_string() });
        }
    }
    copy_tree(&ctx.base_dir, &ctx.working_dir).map_err(|source| SubstitutionError::BaseCopyFailed { source })?;
    debug!("[{}] copied base files from {}", ctx.new_id, ctx.base_dir.display());
    Ok(ctx)
}

/// Etapa `CopyOverlay`: entradas en orden de declaración. La colisión se
/// comprueba contra el árbol ya fusionado, incluidas las copias de entradas
/// anteriores.
pub fn copy_overlays(mut ctx: PipelineContext) -> Result<PipelineContext, SubstitutionError> {
    for index in 0..ctx.substitution.len() {
        let raw = ctx.substitution.entries()[index].overlay().to_string();
        let working_dir = ctx.working_dir.clone();
        let placement = resolve_overlay_placement(&raw, |rel| join_relative(&working_dir, rel).exists());
        if placement.normalized.is_empty() {
            return Err(SubstitutionError::OverlayFileFieldMissing { index });
        }

        let source = join_relative(&ctx.overlay_dir, &placement.normalized);
        if !source.exists() {
            return Err(SubstitutionError::OverlayFileNotFound { path: placement.normalized });
        }
        let target = join_relative(&ctx.working_dir, &placement.destination);
        place(&source, &target).map_err(|source| SubstitutionError::OverlayCopyFailed { path: placement.normalized.clone(),
                                                                                        source })?;
        debug!("[{}] copied overlay {} to {}", ctx.new_id, placement.normalized, placement.destination);

        ctx.substitution.entries_mut()[index].record_placement(placement.normalized, placement.renamed_as);
    }
    Ok(ctx)
}

fn place(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        return copy_tree(source, target);
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_keeps_nested_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/c.txt"), "c").unwrap();
        fs::write(src.path().join("top.txt"), "t").unwrap();

        copy_tree(src.path(), &dst.path().join("out")).unwrap();
        assert_eq!(fs::read_to_string(dst.path().join("out/a/b/c.txt")).unwrap(), "c");
        assert_eq!(fs::read_to_string(dst.path().join("out/top.txt")).unwrap(), "t");
    }

    #[test]
    fn copy_tree_of_missing_source_fails() {
        let dst = tempfile::tempdir().unwrap();
        assert!(copy_tree(Path::new("/definitely/not/here"), dst.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_recreates_symlinks_without_following_them() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "s").unwrap();
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("data.csv"), "d").unwrap();
        std::os::unix::fs::symlink(outside.path(), src.path().join("link")).unwrap();
        std::os::unix::fs::symlink(src.path(), src.path().join("self")).unwrap();
        let dst = tempfile::tempdir().unwrap();

        copy_tree(src.path(), dst.path()).unwrap();
        let link = dst.path().join("link");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), outside.path());
        assert!(fs::symlink_metadata(dst.path().join("self")).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(dst.path().join("data.csv")).unwrap(), "d");
    }
}
