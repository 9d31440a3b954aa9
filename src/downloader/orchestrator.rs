// Request flow: post -> manifest -> selection -> fetch -> mux
//
// Each call is one independent unit of work; the Downloader holds no
// per-request state and can be shared across tasks.

use std::sync::Arc;

use super::errors::{DownloadError, MuxError};
use super::format_selector::FormatSelector;
use super::manifest;
use super::metadata::PostSnapshot;
use super::models::{DownloadedMedia, MediaPayload, MediaType, ResolvedMedia, VariantSet};
use super::muxer::MuxOrchestrator;
use super::traits::{ContentLengthProbe, StreamFetcher};
use super::utils::{is_reddit_url, sanitize_file_name, strip_query};
use super::web::WebClient;
use crate::config::Config;

pub struct Downloader<C = WebClient> {
    client: Arc<C>,
    muxer: MuxOrchestrator,
    size_limit: u64,
    fetch_subreddit_stats: bool,
}

impl Downloader<WebClient> {
    pub fn new(config: &Config) -> Result<Self, DownloadError> {
        let client = WebClient::new(&config.network)?;
        Ok(Self::with_client(
            client,
            MuxOrchestrator::from_config(&config.mux),
            config.size_limit,
        )
        .with_subreddit_stats(config.fetch_subreddit_stats))
    }
}

impl<C> Downloader<C>
where
    C: ContentLengthProbe + StreamFetcher,
{
    pub fn with_client(client: C, muxer: MuxOrchestrator, size_limit: u64) -> Self {
        Self {
            client: Arc::new(client),
            muxer,
            size_limit,
            fetch_subreddit_stats: true,
        }
    }

    pub fn with_subreddit_stats(mut self, enabled: bool) -> Self {
        self.fetch_subreddit_stats = enabled;
        self
    }

    /// Resolve a Reddit post link into a single media payload
    pub async fn resolve(
        &self,
        post_url: &str,
        media_type: MediaType,
    ) -> Result<ResolvedMedia, DownloadError> {
        if !is_reddit_url(post_url) {
            return Err(DownloadError::InvalidUrl(post_url.to_string()));
        }

        tracing::info!("Resolving {} as {}", post_url, media_type);
        let post = self.fetch_post(post_url).await?;
        let dash_url = post
            .dash_url
            .clone()
            .ok_or(DownloadError::NoVariantsFound)?;

        let variants = self.fetch_variants(&dash_url).await?;
        let media = self.download_variants(&variants, media_type).await?;

        let stem = sanitize_file_name(post.post.title.as_deref().unwrap_or_default());
        let file_name = format!("{}.{}", stem, media.extension());
        tracing::info!("Resolved {} -> {} ({})", post_url, file_name, media.variant);

        Ok(ResolvedMedia {
            media,
            file_name,
            post,
        })
    }

    /// Download and extract the post document behind `post_url`
    pub async fn fetch_post(&self, post_url: &str) -> Result<PostSnapshot, DownloadError> {
        let json_url = format!("{}.json?limit=1", strip_query(post_url));
        let body = self.client.fetch_string(&json_url).await?;
        if body.trim().is_empty() {
            return Err(DownloadError::Metadata("empty JSON document".to_string()));
        }

        let document: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| DownloadError::Metadata(format!("invalid JSON: {}", e)))?;
        let mut post = PostSnapshot::from_listing(&document)?;

        if self.fetch_subreddit_stats {
            self.load_subreddit_stats(&mut post).await;
        }
        Ok(post)
    }

    /// Subreddit numbers are decoration; failures are only logged
    async fn load_subreddit_stats(&self, post: &mut PostSnapshot) {
        let Some(about_url) = post.subreddit_about_url() else {
            return;
        };

        let about = match self.client.fetch_string(&about_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Subreddit stats unavailable: {}", e);
                return;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&about) {
            Ok(doc) => post.apply_subreddit_about(&doc),
            Err(e) => tracing::warn!("Subreddit stats are not JSON: {}", e),
        }
    }

    /// Fetch and parse the DASH playlist at `dash_url`
    pub async fn fetch_variants(&self, dash_url: &str) -> Result<VariantSet, DownloadError> {
        let dash_url = strip_query(dash_url);
        let playlist = self.client.fetch_string(dash_url).await?;
        let variants = manifest::parse(&playlist, dash_url)?;
        tracing::debug!("Manifest {} lists {} variant(s)", dash_url, variants.len());
        Ok(variants)
    }

    /// Fetch the streams `media_type` asks for and mux them if needed
    pub async fn download_variants(
        &self,
        variants: &VariantSet,
        media_type: MediaType,
    ) -> Result<DownloadedMedia, DownloadError> {
        if media_type == MediaType::AudioOnly {
            return self.download_audio(variants).await;
        }

        let probe: &dyn ContentLengthProbe = self.client.as_ref();
        let (variant, index) =
            FormatSelector::select_best_fitting(variants, self.size_limit, probe).await?;

        let video = self.client.fetch(Some(&variant.url)).await?;
        let audio = match media_type {
            MediaType::Video => match self.client.fetch(variant.audio_url.as_deref()).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::warn!("Audio fetch failed, continuing without audio: {}", e);
                    None
                }
            },
            _ => None,
        };

        let payload = self.muxer.mux(video, audio).await?;
        Ok(DownloadedMedia {
            payload,
            variant,
            index,
            media_type,
        })
    }

    /// The audio track is shared by all variants; take it from the last one
    async fn download_audio(
        &self,
        variants: &VariantSet,
    ) -> Result<DownloadedMedia, DownloadError> {
        let index = variants
            .len()
            .checked_sub(1)
            .ok_or(DownloadError::NoVariantsFound)?;
        let variant = variants
            .get(index)
            .cloned()
            .ok_or(DownloadError::NoVariantsFound)?;

        let audio = self
            .client
            .fetch(variant.audio_url.as_deref())
            .await?
            .ok_or(MuxError::NoMedia)?;

        Ok(DownloadedMedia {
            payload: MediaPayload::Bytes(audio),
            variant,
            index,
            media_type: MediaType::AudioOnly,
        })
    }
}
