// ucdx-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{Result, UcdError};

const DEFAULT_UCD_PREFIX: &str = "https://www.unicode.org/Public/UCD/latest/ucd/";
const STATE_FILE_NAME: &str = "ucd-state.json";

const CACHE_DIR_ENV: &str = "UCDX_CACHE_DIR";
const PREFIX_ENV: &str = "UCDX_PREFIX";
const CHECK_IN_CI_ENV: &str = "UCDX_CHECK_IN_CI";

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub prefix: String,
    /// Perform conditional network checks even when a CI environment is
    /// detected. Off by default so CI runs never hit unicode.org.
    pub check_in_ci: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading ucdx configuration");

        let cache_dir = match env::var(CACHE_DIR_ENV).ok().filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };
        debug!("Effective cache dir: {}", cache_dir.display());

        let prefix = env::var(PREFIX_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_UCD_PREFIX.to_string());

        let check_in_ci = env::var(CHECK_IN_CI_ENV)
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);

        Ok(Self {
            cache_dir,
            prefix,
            check_in_ci,
        })
    }

    /// Configuration rooted at an explicit cache directory, with defaults
    /// for everything else. Useful for embedding and tests.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            prefix: DEFAULT_UCD_PREFIX.to_string(),
            check_in_ci: false,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Backing file for the state store, inside the cache directory.
    pub fn state_path(&self) -> PathBuf {
        self.cache_dir.join(STATE_FILE_NAME)
    }
}

fn default_cache_dir() -> Result<PathBuf> {
    if let Some(base) = dirs::cache_dir() {
        return Ok(base.join("ucdx"));
    }
    // Headless environments without an XDG-style cache location.
    let cwd = env::current_dir()
        .map_err(|e| UcdError::Config(format!("Cannot resolve a cache directory: {e}")))?;
    Ok(cwd.join(".ucdx-cache"))
}

/// Ambient continuous-integration signal.
///
/// Covers Travis CI, CircleCI, Cirrus CI, Gitlab CI, Appveyor, CodeShip,
/// GitHub Actions (`CI`, `CONTINUOUS_INTEGRATION`), Jenkins and TeamCity
/// (`BUILD_NUMBER`), TaskCluster and dsari (`RUN_ID`).
pub fn ci_signal() -> bool {
    ["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER", "RUN_ID"]
        .iter()
        .any(|v| env::var(v).map(|s| !s.is_empty()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_cache_dir_defaults() {
        let config = Config::with_cache_dir("/tmp/ucdx-test");
        assert_eq!(config.prefix(), DEFAULT_UCD_PREFIX);
        assert!(!config.check_in_ci);
        assert_eq!(
            config.state_path(),
            Path::new("/tmp/ucdx-test").join(STATE_FILE_NAME)
        );
    }
}
