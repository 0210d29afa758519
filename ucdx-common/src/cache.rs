// Raw on-disk storage for fetched UCD files.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{Result, UcdError};

/// Directory-rooted text cache, one file per logical name.
///
/// Logical names may contain sub-paths (`extracted/DerivedName.txt`);
/// parent directories are created lazily on store.
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a new Cache rooted at `cache_dir`, creating the directory if
    /// it does not exist yet.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        if cache_dir.exists() {
            if !cache_dir.is_dir() {
                return Err(UcdError::Config(format!(
                    "Cache directory is not a directory: \"{}\"",
                    cache_dir.display()
                )));
            }
        } else {
            fs::create_dir_all(&cache_dir)?;
        }
        Ok(Self { cache_dir })
    }

    /// Gets the cache directory path
    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Full on-disk path for a logical name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Stores raw string data in the cache
    pub fn store_raw(&self, name: &str, data: &str) -> Result<()> {
        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::debug!("Saving raw data to cache file: {:?}", path);
        fs::write(&path, data)?;
        Ok(())
    }

    /// Loads raw string data from the cache
    pub fn load_raw(&self, name: &str) -> Result<String> {
        let path = self.path_for(name);
        tracing::debug!("Loading raw data from cache file: {:?}", path);

        if !path.exists() {
            return Err(UcdError::Cache(format!(
                "Cache file {name} does not exist"
            )));
        }

        fs::read_to_string(&path).map_err(|e| UcdError::Cache(format!("IO error: {e}")))
    }

    /// Clears all cache files
    pub fn clear_all(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}
