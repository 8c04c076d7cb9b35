//! Per-source cache directories.
//!
//! The mount layer keeps derived data (seek tables, decompressed indexes) for a
//! Clonezilla image under a directory of its own inside the shared cache
//! folder. The directory name combines the image folder name with a short hash
//! of its full path, so two images with the same folder name do not collide.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Length of the hex hash suffix in cache directory names.
const KEY_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheManager {
    source: PathBuf,
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(source: &Path, cache_folder: &Path) -> Self {
        let source = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        let key = blake3::hash(source.to_string_lossy().as_bytes()).to_hex();
        let label = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let cache_dir = cache_folder.join(format!("{label}-{}", &key.as_str()[..KEY_LEN]));
        Self { source, cache_dir }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Creates the cache directory (and the cache folder) if missing.
    pub fn ensure_cache_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| CatalogError::io(e, &self.cache_dir))
    }

    /// Where the cached data of one partition lives.
    pub fn partition_cache_file(&self, partition: &str) -> PathBuf {
        self.cache_dir.join(format!("{partition}.cache.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn same_folder_name_different_parents_do_not_collide() -> Result<()> {
        let root = tempdir()?;
        let a = root.path().join("a").join("2024-01-img");
        let b = root.path().join("b").join("2024-01-img");
        fs::create_dir_all(&a)?;
        fs::create_dir_all(&b)?;
        let cache = root.path().join("cache");

        let ca = CacheManager::new(&a, &cache);
        let cb = CacheManager::new(&b, &cache);
        assert_ne!(ca.cache_dir(), cb.cache_dir());
        assert!(ca.cache_dir().starts_with(&cache));
        assert!(ca
            .cache_dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("2024-01-img-"));
        Ok(())
    }

    #[test]
    fn cache_dir_is_stable_and_created_on_demand() -> Result<()> {
        let root = tempdir()?;
        let cache = root.path().join("cache");
        let first = CacheManager::new(root.path(), &cache);
        let second = CacheManager::new(root.path(), &cache);
        assert_eq!(first, second);

        assert!(!first.cache_dir().exists());
        first.ensure_cache_dir()?;
        assert!(first.cache_dir().is_dir());
        assert_eq!(
            first.partition_cache_file("sda1"),
            first.cache_dir().join("sda1.cache.json")
        );
        Ok(())
    }
}
