// WebClient - reqwest-backed probe and fetcher
//
// One shared client for manifests, post documents and media streams.
// Proxy and timeout come from NetworkConfig; an unusable proxy URL is
// logged and the client connects directly.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use std::time::Duration;

use super::errors::{FetchError, ProbeError};
use super::models::NetworkConfig;
use super::traits::{ContentLengthProbe, StreamFetcher};

#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
}

impl WebClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => {
                    tracing::debug!("Using proxy {}", proxy_url);
                    builder = builder.proxy(proxy);
                }
                Err(e) => {
                    tracing::warn!("Invalid proxy URL {}, connecting directly: {}", proxy_url, e);
                }
            }
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Size advertised by a response, if it carries a parseable Content-Length
    fn content_length(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    async fn head_length(&self, url: &str) -> Result<Option<u64>, reqwest::Error> {
        let response = self.client.head(url).send().await?.error_for_status()?;
        Ok(Self::content_length(response.headers()))
    }

    /// Some CDNs refuse HEAD; read the headers of a GET and drop the body
    async fn get_length(&self, url: &str) -> Result<Option<u64>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(Self::content_length(response.headers()))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentLengthProbe for WebClient {
    async fn probe(&self, url: &str) -> Result<u64, ProbeError> {
        match self.head_length(url).await {
            Ok(Some(length)) => return Ok(length),
            Ok(None) => tracing::debug!("HEAD {} gave no length, retrying with GET", url),
            Err(e) => tracing::debug!("HEAD {} failed ({}), retrying with GET", url, e),
        }

        match self.get_length(url).await {
            Ok(Some(length)) => Ok(length),
            Ok(None) => Err(ProbeError::MissingLength {
                url: url.to_string(),
            }),
            Err(source) => Err(ProbeError::Request {
                url: url.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl StreamFetcher for WebClient {
    async fn fetch_string(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch(&self, url: Option<&str>) -> Result<Option<Bytes>, FetchError> {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        tracing::debug!("Fetching {}", url);
        let response = self.get(url).await?;
        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(Some(body))
    }
}
