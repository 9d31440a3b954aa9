// Network seams used by the selector and the request flow

use async_trait::async_trait;
use bytes::Bytes;

use super::errors::{FetchError, ProbeError};

/// Asks a remote resource for its byte size without downloading it
#[async_trait]
pub trait ContentLengthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<u64, ProbeError>;
}

/// Retrieves documents and raw media streams
#[async_trait]
pub trait StreamFetcher: Send + Sync {
    /// Download a text document (manifest, JSON)
    async fn fetch_string(&self, url: &str) -> Result<String, FetchError>;

    /// Download a media stream.
    ///
    /// An absent or empty URL is `Ok(None)`, not an error; a variant may
    /// legitimately have no separate audio track.
    async fn fetch(&self, url: Option<&str>) -> Result<Option<Bytes>, FetchError>;
}
