pub mod config;
pub mod downloader;

pub use config::Config;
pub use downloader::{DownloadError, Downloader, MediaType, ResolvedMedia};
