// Error types for the resolve/fetch/mux pipeline

use std::io;

/// Failure while asking a remote resource for its size
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The request itself failed (connect, TLS, timeout, error status)
    #[error("probe request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered without a usable Content-Length header
    #[error("no content length reported for {url}")]
    MissingLength { url: String },
}

/// Failure while retrieving a manifest, document or media stream
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The HTTP client could not be built (bad proxy, TLS setup)
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure while combining separate audio and video streams
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// Neither an audio nor a video stream was available
    #[error("no media streams to mux")]
    NoMedia,

    /// The muxer is missing, exited non-zero, timed out or wrote nothing
    #[error("muxing process failed: {0}")]
    ProcessFailed(String),

    /// Writing the input streams to the working directory failed
    #[error("failed to stage mux input: {0}")]
    Staging(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Source URL is not a Reddit post link
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Bandwidth, base URL and frame rate counts disagree
    #[error(
        "Inconsistent manifest: {bandwidths} bandwidths, {urls} base URLs, {frame_rates} frame rates"
    )]
    InconsistentManifest {
        bandwidths: usize,
        urls: usize,
        frame_rates: usize,
    },

    /// Manifest (or post) carries no video renditions
    #[error("No video variants found")]
    NoVariantsFound,

    /// Every variant is larger than the size budget
    #[error("No variant fits within {budget} bytes")]
    NoFit { budget: u64 },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Mux(#[from] MuxError),

    /// Post metadata document is empty or not a listing
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// A numeric manifest field could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DownloadError {
    /// Whether this is an expected outcome rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoFit { .. } | Self::InvalidUrl(_))
    }

    /// Single line shown to the end user at the request boundary.
    ///
    /// Transport and mux failures collapse into one generic message; the
    /// detailed error is meant for the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl(_) => "Not a valid Reddit URL".to_string(),
            Self::NoVariantsFound => "Not a video!".to_string(),
            Self::NoFit { budget } => format!(
                "File is too large for the size budget of {:.2} MB",
                *budget as f64 / 1_000_000.0
            ),
            Self::InconsistentManifest { .. } | Self::Parse(_) => {
                "Something went wrong while reading the video manifest".to_string()
            }
            Self::Metadata(_) => "Could not read the post metadata".to_string(),
            Self::Probe(_) | Self::Fetch(_) | Self::Mux(_) => {
                "Failed to download video".to_string()
            }
        }
    }
}
