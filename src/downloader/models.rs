// Common data models for the downloader

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncReadExt;

use super::metadata::PostSnapshot;
use super::utils::TempFileGuard;

/// One downloadable rendition of a media asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Absolute media URL
    pub url: String,
    /// Separately delivered audio track, if any
    pub audio_url: Option<String>,
    /// Declared bandwidth in bits/second
    pub bandwidth: u64,
    /// Vertical resolution in pixels (e.g. 720)
    pub resolution: u32,
    /// Frames per second
    pub frame_rate: u32,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}p @ {}fps ({} kbps)",
            self.resolution,
            self.frame_rate,
            self.bandwidth / 1000
        )
    }
}

/// Variants of one manifest, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantSet {
    variants: Vec<Variant>,
}

impl VariantSet {
    pub fn new(variants: Vec<Variant>) -> Self {
        Self { variants }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Variant> {
        self.variants.get(index)
    }

    /// Last declared variant, conventionally the highest quality
    pub fn last(&self) -> Option<&Variant> {
        self.variants.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.variants.iter()
    }

    pub fn as_slice(&self) -> &[Variant] {
        &self.variants
    }

    /// True when resolution never decreases with the declaration index
    pub fn is_quality_ascending(&self) -> bool {
        self.variants
            .windows(2)
            .all(|pair| pair[0].resolution <= pair[1].resolution)
    }
}

impl From<Vec<Variant>> for VariantSet {
    fn from(variants: Vec<Variant>) -> Self {
        Self::new(variants)
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a Variant;
    type IntoIter = std::slice::Iter<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

/// What the caller wants out of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaType {
    /// Best fitting video with its audio muxed in
    #[default]
    Video,
    /// Best fitting video stream without audio
    VideoOnly,
    /// Audio track of the highest variant
    AudioOnly,
}

impl MediaType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Video | Self::VideoOnly => "mp4",
            Self::AudioOnly => "m4a",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::VideoOnly => write!(f, "video-only"),
            Self::AudioOnly => write!(f, "audio-only"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "video-only" | "videoonly" => Ok(Self::VideoOnly),
            "audio-only" | "audioonly" | "audio" => Ok(Self::AudioOnly),
            other => Err(format!("Unknown media type: {}", other)),
        }
    }
}

/// Output of a completed mux job.
///
/// The file is deleted when this value is dropped, unless it was moved
/// away with [`MuxedFile::persist`].
#[derive(Debug)]
pub struct MuxedFile {
    file: tokio::fs::File,
    // declared after `file` so the handle is closed before the delete
    guard: TempFileGuard,
}

impl MuxedFile {
    pub fn new(file: tokio::fs::File, path: PathBuf) -> Self {
        Self {
            file,
            guard: TempFileGuard::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    /// Logical name of the mux result (`<jobid>_MUX.<container>`)
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Container extension of the output, if it has one
    pub fn extension(&self) -> Option<String> {
        self.path()
            .extension()
            .map(|e| e.to_string_lossy().to_string())
    }

    /// Move the output to `dest`, falling back to copy + delete across devices.
    ///
    /// On failure the output is deleted as well.
    pub async fn persist(self, dest: &Path) -> io::Result<()> {
        let Self { file, guard } = self;
        drop(file);

        if tokio::fs::rename(guard.path(), dest).await.is_ok() {
            guard.disarm();
            return Ok(());
        }

        // the guard removes the source whether or not the copy succeeds
        tokio::fs::copy(guard.path(), dest).await?;
        Ok(())
    }

    pub async fn remove(self) -> io::Result<()> {
        let Self { file, guard } = self;
        drop(file);
        tokio::fs::remove_file(guard.disarm()).await
    }

    async fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// Final media handed back to the caller
#[derive(Debug)]
pub enum MediaPayload {
    /// A single stream returned as downloaded
    Bytes(Bytes),
    /// Audio and video combined on disk
    Muxed(MuxedFile),
}

impl MediaPayload {
    pub fn is_muxed(&self) -> bool {
        matches!(self, Self::Muxed(_))
    }

    /// Container extension of a mux output; in-memory bytes carry none
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Bytes(_) => None,
            Self::Muxed(muxed) => muxed.extension(),
        }
    }

    /// Write the payload to `dest`; a mux output is moved, not copied
    pub async fn persist(self, dest: &Path) -> io::Result<()> {
        match self {
            Self::Bytes(bytes) => tokio::fs::write(dest, &bytes).await,
            Self::Muxed(muxed) => muxed.persist(dest).await,
        }
    }

    /// Read the payload into memory, deleting a mux output afterwards
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Muxed(mut muxed) => {
                let buf = muxed.read_all().await?;
                let path = muxed.path().to_path_buf();
                if let Err(e) = muxed.remove().await {
                    tracing::warn!("Failed to remove mux output {:?}: {}", path, e);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// Streams retrieved for one media type, before naming
#[derive(Debug)]
pub struct DownloadedMedia {
    pub payload: MediaPayload,
    /// Variant the payload came from
    pub variant: Variant,
    /// Index of that variant in its set
    pub index: usize,
    pub media_type: MediaType,
}

impl DownloadedMedia {
    /// File extension for the saved result; a mux output keeps its container
    pub fn extension(&self) -> String {
        self.payload
            .extension()
            .unwrap_or_else(|| self.media_type.extension().to_string())
    }
}

/// Result of a full resolve request
#[derive(Debug)]
pub struct ResolvedMedia {
    pub media: DownloadedMedia,
    /// Suggested file name (post title + extension)
    pub file_name: String,
    pub post: PostSnapshot,
}

/// Network configuration for probes and fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP or SOCKS5 proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Whole-request timeout in seconds; `None` waits forever
    pub timeout_secs: Option<u64>,

    /// Reddit rejects requests without a descriptive agent
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: Some(120),
            user_agent: format!("reddit-downloader/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Settings for the external muxer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Explicit ffmpeg binary; located automatically when unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Directory for `<jobid>_VID/_AUD/_MUX` files, created on demand
    pub work_dir: PathBuf,
    /// Container extension for all three files
    pub container: String,
    /// Target codec for the audio bitstream
    pub audio_codec: String,
    /// Kill the muxer after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            work_dir: PathBuf::from("temp"),
            container: "mp4".to_string(),
            audio_codec: "aac".to_string(),
            timeout_secs: Some(300),
        }
    }
}
