use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cache-validation metadata for one fetched file.
///
/// `etag` is stored with any `-gzip` decoration already removed; Apache
/// rejects its own decorated value on resubmission.
/// See: https://bz.apache.org/bugzilla/show_bug.cgi?id=39727
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// HTTP `ETag` response header value.
    pub etag: String,
    /// HTTP `Last-Modified` response header value, kept verbatim for
    /// `If-Modified-Since` resubmission.
    pub date: String,
    /// Last time the origin was consulted for this file.
    pub last_checked: DateTime<Utc>,
}
