//! Convención de directorios de paquetes publicados: `<root>/<id>/data/`.
use std::path::{Path, PathBuf};

use crate::constants::DATA_DIR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directorio completo del paquete; es lo que borra el cleanup.
    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn data_dir(&self, id: &str) -> PathBuf {
        self.package_dir(id).join(DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nested_under_package_dir() {
        let layout = PackageLayout::new("/srv/compendium");
        assert_eq!(layout.package_dir("abc"), PathBuf::from("/srv/compendium/abc"));
        assert_eq!(layout.data_dir("abc"), PathBuf::from("/srv/compendium/abc/data"));
    }
}
