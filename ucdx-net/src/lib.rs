// ucdx-net/src/lib.rs
//
// Network surface for UCD files: a conditional-GET fetcher backed by the
// on-disk cache and state store from ucdx-common, plus the ReadMe.txt
// version query.
//
// Concurrency note: each fetch is one logical sequential operation. The
// fetcher provides no mutual exclusion across concurrent calls targeting
// the same logical filename in one cache directory; serializing such
// writers is the caller's responsibility.

pub mod client;
pub mod http;
pub mod version;

// Re-export the public surface
pub use client::{FetchOptions, FetchStatus, FileInfo, Ucd};
pub use http::strip_gzip_etag;
pub use ucdx_common::{
    error::{Result, UcdError},
    Config,
};
pub use version::UcdVersion;
