use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::Client;
use ucdx_common::error::{Result, UcdError};

const FETCH_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "ucdx (Rust; +https://github.com/ucdx/ucdx)";

/// Placeholder used when the origin sends no ETag at all.
pub(crate) const FALLBACK_ETAG: &str = "---000---";

pub(crate) fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, USER_AGENT_STRING.parse().unwrap());
    headers.insert(ACCEPT, "*/*".parse().unwrap());
    Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| UcdError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Remove the `-gzip` decoration Apache's mod_deflate appends inside the
/// quoted ETag value. The server rejects its own decorated value when it
/// comes back in `If-None-Match`, so the stored and resubmitted form must
/// be the bare one.
/// See: https://bz.apache.org/bugzilla/show_bug.cgi?id=39727
pub fn strip_gzip_etag(etag: &str) -> String {
    if let Some(inner) = etag.strip_suffix("-gzip\"") {
        format!("{inner}\"")
    } else if let Some(inner) = etag.strip_suffix("-gzip") {
        inner.to_string()
    } else {
        etag.to_string()
    }
}

/// Current time in HTTP-date format, for responses missing Last-Modified.
pub(crate) fn http_date_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
