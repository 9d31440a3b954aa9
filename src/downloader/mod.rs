// Downloader module - Reddit video resolution pipeline

pub mod errors;
pub mod format_selector;
pub mod manifest;
pub mod metadata;
pub mod models;
pub mod muxer;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod web;

pub use errors::{DownloadError, FetchError, MuxError, ProbeError};
pub use format_selector::FormatSelector;
pub use metadata::PostSnapshot;
pub use models::{
    DownloadedMedia, MediaPayload, MediaType, MuxConfig, MuxedFile, NetworkConfig, ResolvedMedia,
    Variant, VariantSet,
};
pub use muxer::MuxOrchestrator;
pub use orchestrator::Downloader;
pub use tools::{ToolInfo, ToolManager};
pub use traits::{ContentLengthProbe, StreamFetcher};
pub use web::WebClient;
