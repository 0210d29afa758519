use chrono::Utc;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use tracing::{debug, error};
use ucdx_common::cache::Cache;
use ucdx_common::config::{ci_signal, Config};
use ucdx_common::error::{Result, UcdError};
use ucdx_common::model::{FileState, UcdFile};
use ucdx_common::store::StateStore;
use url::Url;

use crate::http::{build_http_client, http_date_now, strip_gzip_etag, FALLBACK_ETAG};
use crate::version::{scan_readme, UcdVersion};

const README_NAME: &str = "ReadMe.txt";

/// Per-call overrides for one fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Validator from a previous response; takes precedence over the
    /// state store's.
    pub etag: Option<String>,
    /// `Last-Modified` from a previous response; takes precedence over
    /// the state store's.
    pub last_modified: Option<String>,
    /// Override ambient CI detection, for hosts and tests.
    pub ci: Option<bool>,
}

/// How the returned bytes were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// HTTP 200: fresh bytes from the origin.
    Fetched,
    /// HTTP 304, or the CI short-circuit: bytes come from the local cache.
    NotModified,
}

/// Result of a fetch or fetch-then-parse operation.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub status: FetchStatus,
    pub etag: String,
    pub last_modified: String,
    pub text: Option<String>,
    pub parsed: Option<UcdFile>,
}

/// Fetcher and cache manager for UCD files.
///
/// Resolves logical filenames to current bytes, consulting the state
/// store for freshness metadata and issuing conditional GETs. One logical
/// sequential operation per call; no mutual exclusion is provided across
/// concurrent calls for the same filename in one cache directory.
pub struct Ucd {
    config: Config,
    client: reqwest::Client,
    cache: Cache,
    store: StateStore,
}

impl Ucd {
    /// Build a fetcher over `config`, creating the cache directory if
    /// needed and loading the state store.
    pub fn new(config: Config) -> Result<Self> {
        let cache = Cache::new(config.cache_dir())?;
        let store = StateStore::load(config.state_path())?;
        let client = build_http_client()?;
        Ok(Self {
            config,
            client,
            cache,
            store,
        })
    }

    /// Fetcher over the environment-derived configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::load()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `name` to its current bytes.
    ///
    /// In CI (unless configured to check anyway) this never touches the
    /// network and serves the local copy. Otherwise it issues a
    /// conditional GET: 200 refreshes the file cache and state store, 304
    /// serves the cached copy untouched, and anything else is fatal.
    pub async fn fetch(&mut self, name: &str, opts: &FetchOptions) -> Result<FileInfo> {
        if self.ci_active(opts) {
            debug!("CI detected, serving '{}' from local cache", name);
            let text = self.cache.load_raw(name)?;
            let (etag, last_modified) = self.prior_validators(name, opts);
            return Ok(FileInfo {
                status: FetchStatus::NotModified,
                etag: etag.unwrap_or_else(|| FALLBACK_ETAG.to_string()),
                last_modified: last_modified.unwrap_or_else(http_date_now),
                text: Some(text),
                parsed: None,
            });
        }

        let url = self.url_for(name)?;
        let (prior_etag, prior_date) = self.prior_validators(name, opts);

        let mut request = self.client.get(url.clone());
        if let Some(date) = &prior_date {
            request = request.header(IF_MODIFIED_SINCE, date.as_str());
        }
        if let Some(etag) = &prior_etag {
            request = request.header(IF_NONE_MATCH, strip_gzip_etag(etag));
        }

        debug!(
            "Checking \"{}\" (etag: {:?}, last-modified: {:?})",
            url, prior_etag, prior_date
        );
        let response = request.send().await?;
        let status = response.status();

        let etag = header_string(&response, ETAG)
            .map(|e| strip_gzip_etag(&e))
            .or(prior_etag)
            .unwrap_or_else(|| FALLBACK_ETAG.to_string());
        let last_modified = header_string(&response, LAST_MODIFIED)
            .or(prior_date)
            .unwrap_or_else(http_date_now);

        match status {
            StatusCode::OK => {
                let text = response.text().await?;
                self.cache.store_raw(name, &text)?;
                self.remember(name, &etag, &last_modified)?;
                Ok(FileInfo {
                    status: FetchStatus::Fetched,
                    etag,
                    last_modified,
                    text: Some(text),
                    parsed: None,
                })
            }
            StatusCode::NOT_MODIFIED => {
                debug!("'{}' not modified, using cached copy", name);
                let text = self.cache.load_raw(name)?;
                self.remember(name, &etag, &last_modified)?;
                Ok(FileInfo {
                    status: FetchStatus::NotModified,
                    etag,
                    last_modified,
                    text: Some(text),
                    parsed: None,
                })
            }
            other => {
                error!("Unexpected HTTP status {} for \"{}\"", other, url);
                Err(UcdError::HttpStatus(other.as_u16(), url.to_string()))
            }
        }
    }

    /// Fetch `name` and, when the origin returned fresh bytes, parse them.
    ///
    /// A 304 (or CI short-circuit) result deliberately leaves `parsed`
    /// empty; use [`Ucd::parse_cached`] to re-read and parse the local
    /// copy explicitly.
    pub async fn parse(&mut self, name: &str, opts: &FetchOptions) -> Result<FileInfo> {
        let mut info = self.fetch(name, opts).await?;
        if info.status == FetchStatus::Fetched {
            if let Some(text) = &info.text {
                info.parsed = Some(ucdx_core::parse(text).map_err(UcdError::Parse)?);
            }
        }
        Ok(info)
    }

    /// Parse the locally cached copy of `name` without any network
    /// traffic. Fails with a cache error when the file was never fetched.
    pub fn parse_cached(&self, name: &str) -> Result<UcdFile> {
        let text = self.cache.load_raw(name)?;
        ucdx_core::parse(&text).map_err(UcdError::Parse)
    }

    /// Fetch `ReadMe.txt` and extract the UCD release date and version.
    pub async fn version(&mut self, opts: &FetchOptions) -> Result<UcdVersion> {
        let info = self.fetch(README_NAME, opts).await?;
        let text = info
            .text
            .ok_or_else(|| UcdError::NotFound(README_NAME.to_string()))?;
        let (date, version) = scan_readme(&text)?;
        Ok(UcdVersion {
            date,
            version,
            etag: info.etag,
            last_modified: info.last_modified,
        })
    }

    /// Cache-validation metadata currently stored for `name`.
    pub fn state(&self, name: &str) -> Option<&FileState> {
        self.store.get(name)
    }

    /// Remove every cached file and reset the state store.
    pub fn clear(&mut self) -> Result<()> {
        self.cache.clear_all()?;
        self.store = StateStore::load(self.config.state_path())?;
        Ok(())
    }

    fn ci_active(&self, opts: &FetchOptions) -> bool {
        let ci = opts.ci.unwrap_or_else(ci_signal);
        ci && !self.config.check_in_ci
    }

    /// Validators for the next conditional request: per-call overrides
    /// win over the state store.
    fn prior_validators(
        &self,
        name: &str,
        opts: &FetchOptions,
    ) -> (Option<String>, Option<String>) {
        let stored = self.store.get(name);
        let etag = opts
            .etag
            .clone()
            .or_else(|| stored.map(|s| s.etag.clone()));
        let date = opts
            .last_modified
            .clone()
            .or_else(|| stored.map(|s| s.date.clone()));
        (etag, date)
    }

    fn remember(&mut self, name: &str, etag: &str, last_modified: &str) -> Result<()> {
        self.store.set(
            name,
            FileState {
                etag: etag.to_string(),
                date: last_modified.to_string(),
                last_checked: Utc::now(),
            },
        )
    }

    fn url_for(&self, name: &str) -> Result<Url> {
        let base = Url::parse(self.config.prefix())
            .map_err(|e| UcdError::Config(format!("Invalid UCD prefix: {e}")))?;
        base.join(name)
            .map_err(|e| UcdError::Config(format!("Invalid file name \"{name}\": {e}")))
    }
}

fn header_string(response: &reqwest::Response, header: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(dir: &std::path::Path) -> Ucd {
        Ucd::new(Config::with_cache_dir(dir)).unwrap()
    }

    #[tokio::test]
    async fn ci_bypass_serves_local_copy_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut ucd = fetcher(dir.path());
        // Prefix points nowhere routable; a network attempt would fail.
        ucd.config.prefix = "http://192.0.2.1/ucd/".to_string();
        ucd.cache.store_raw("Blocks.txt", "0000..007F; Basic Latin\n").unwrap();

        let opts = FetchOptions {
            ci: Some(true),
            ..FetchOptions::default()
        };
        let info = ucd.fetch("Blocks.txt", &opts).await.unwrap();
        assert_eq!(info.status, FetchStatus::NotModified);
        assert_eq!(info.text.as_deref(), Some("0000..007F; Basic Latin\n"));
        assert_eq!(info.etag, FALLBACK_ETAG);
        assert!(info.parsed.is_none());
    }

    #[tokio::test]
    async fn ci_bypass_with_empty_cache_is_a_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ucd = fetcher(dir.path());
        let opts = FetchOptions {
            ci: Some(true),
            ..FetchOptions::default()
        };
        assert!(matches!(
            ucd.fetch("Blocks.txt", &opts).await,
            Err(UcdError::Cache(_))
        ));
    }

    #[tokio::test]
    async fn ci_bypass_prefers_caller_validators() {
        let dir = tempfile::tempdir().unwrap();
        let mut ucd = fetcher(dir.path());
        ucd.cache.store_raw("Blocks.txt", "x").unwrap();

        let opts = FetchOptions {
            ci: Some(true),
            etag: Some("\"caller\"".to_string()),
            last_modified: Some("Mon, 28 Aug 2023 00:00:00 GMT".to_string()),
        };
        let info = ucd.fetch("Blocks.txt", &opts).await.unwrap();
        assert_eq!(info.etag, "\"caller\"");
        assert_eq!(info.last_modified, "Mon, 28 Aug 2023 00:00:00 GMT");
    }

    #[tokio::test]
    async fn check_in_ci_disables_the_bypass() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_cache_dir(dir.path());
        config.check_in_ci = true;
        // Closed port: if the bypass were taken this would succeed from
        // cache instead of failing to connect.
        config.prefix = "http://127.0.0.1:1/".to_string();
        let mut ucd = Ucd::new(config).unwrap();
        ucd.cache.store_raw("Blocks.txt", "x").unwrap();

        let opts = FetchOptions {
            ci: Some(true),
            ..FetchOptions::default()
        };
        assert!(matches!(
            ucd.fetch("Blocks.txt", &opts).await,
            Err(UcdError::Http(_))
        ));
    }

    #[test]
    fn parse_cached_reads_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let ucd = fetcher(dir.path());
        ucd.cache
            .store_raw("Blocks.txt", "0000..007F; Basic Latin\n")
            .unwrap();
        let parsed = ucd.parse_cached("Blocks.txt").unwrap();
        assert_eq!(parsed.entries.len(), 1);

        assert!(matches!(
            ucd.parse_cached("Missing.txt"),
            Err(UcdError::Cache(_))
        ));
    }

    #[test]
    fn parse_cached_surfaces_parse_errors_as_parse_family() {
        let dir = tempfile::tempdir().unwrap();
        let ucd = fetcher(dir.path());
        ucd.cache.store_raw("Bad.txt", "not a data row\n").unwrap();
        assert!(matches!(
            ucd.parse_cached("Bad.txt"),
            Err(UcdError::Parse(_))
        ));
    }

    #[test]
    fn bad_prefix_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ucd = fetcher(dir.path());
        ucd.config.prefix = "not a url".to_string();
        assert!(matches!(
            ucd.url_for("Blocks.txt"),
            Err(UcdError::Config(_))
        ));
    }
}
