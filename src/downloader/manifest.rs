// Manifest parser - DASH playlist text to an ordered VariantSet
//
// The playlist is scanned into three positional field lists (bandwidths,
// base URLs, frame rates). The lists must line up one-to-one; that check
// happens once, in `validate`, before any Variant is built.

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::DownloadError;
use super::models::{Variant, VariantSet};
use super::utils::strip_query;

/// Base URL tokens outside these buckets are ignored
pub const RESOLUTION_BUCKETS: [u32; 6] = [220, 240, 360, 480, 720, 1080];

/// Filename of the combined audio track in current playlists
const COMBINED_AUDIO_FILE: &str = "DASH_audio.mp4";
/// Filename of the audio track in older playlists
const LEGACY_AUDIO_FILE: &str = "audio";

lazy_static! {
    static ref BANDWIDTH_RE: Regex =
        Regex::new(r#"Representation bandwidth="(?P<bandwidth>[^"]*)""#).unwrap();
    static ref BASE_URL_RE: Regex = {
        let buckets = RESOLUTION_BUCKETS
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            r"BaseURL>(?P<token>DASH_(?P<resolution>{}))(?P<ext>\.mp4)?<",
            buckets
        ))
        .unwrap()
    };
    static ref FRAME_RATE_RE: Regex =
        Regex::new(r#"\bframeRate="(?P<num>[^"/]*)(?:/(?P<den>[^"]*))?""#).unwrap();
}

/// How the playlist delivers audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTrack {
    /// Separate `DASH_audio.mp4` next to the video renditions
    Combined,
    /// Older `audio` file convention
    Legacy,
    /// No audio at all
    None,
}

impl AudioTrack {
    pub fn detect(manifest: &str) -> Self {
        if manifest.contains(COMBINED_AUDIO_FILE) {
            Self::Combined
        } else if manifest.contains(LEGACY_AUDIO_FILE) {
            Self::Legacy
        } else {
            Self::None
        }
    }

    fn url(&self, media_root: &str) -> Option<String> {
        match self {
            Self::Combined => Some(format!("{}{}", media_root, COMBINED_AUDIO_FILE)),
            Self::Legacy => Some(format!("{}{}", media_root, LEGACY_AUDIO_FILE)),
            Self::None => None,
        }
    }
}

/// A `BaseURL` entry restricted to the resolution buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlToken {
    /// e.g. `DASH_720`
    pub token: String,
    pub resolution: u32,
    /// `.mp4` when the token carries it
    pub extension: Option<String>,
}

/// Raw positional fields pulled out of a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFields {
    pub bandwidths: Vec<u64>,
    pub base_urls: Vec<BaseUrlToken>,
    pub frame_rates: Vec<u32>,
    pub audio: AudioTrack,
}

impl ManifestFields {
    /// Scan playlist text, in order of appearance
    pub fn tokenize(manifest: &str) -> Result<Self, DownloadError> {
        let bandwidths = BANDWIDTH_RE
            .captures_iter(manifest)
            .map(|caps| {
                let raw = &caps["bandwidth"];
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| DownloadError::Parse(format!("invalid bandwidth {:?}", raw)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let base_urls = BASE_URL_RE
            .captures_iter(manifest)
            .map(|caps| -> Result<BaseUrlToken, DownloadError> {
                let raw = &caps["resolution"];
                let resolution = raw
                    .parse::<u32>()
                    .map_err(|_| DownloadError::Parse(format!("invalid resolution {:?}", raw)))?;
                Ok(BaseUrlToken {
                    token: caps["token"].to_string(),
                    resolution,
                    extension: caps.name("ext").map(|m| m.as_str().to_string()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let frame_rates = FRAME_RATE_RE
            .captures_iter(manifest)
            .map(|caps| parse_frame_rate(&caps["num"], caps.name("den").map(|m| m.as_str())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bandwidths,
            base_urls,
            frame_rates,
            audio: AudioTrack::detect(manifest),
        })
    }

    /// The three lists must be of equal length, then non-empty.
    ///
    /// A count mismatch wins over an empty base URL list.
    pub fn validate(&self) -> Result<(), DownloadError> {
        let urls = self.base_urls.len();
        if self.bandwidths.len() != urls || self.frame_rates.len() != urls {
            return Err(DownloadError::InconsistentManifest {
                bandwidths: self.bandwidths.len(),
                urls,
                frame_rates: self.frame_rates.len(),
            });
        }

        if urls == 0 {
            return Err(DownloadError::NoVariantsFound);
        }

        Ok(())
    }

    fn into_variants(self, source_url: &str) -> VariantSet {
        let root = media_root(source_url);
        let audio_url = self.audio.url(&root);

        self.base_urls
            .into_iter()
            .zip(self.bandwidths)
            .zip(self.frame_rates)
            .map(|((base, bandwidth), frame_rate)| Variant {
                url: format!(
                    "{}{}{}",
                    root,
                    base.token,
                    base.extension.as_deref().unwrap_or("")
                ),
                audio_url: audio_url.clone(),
                bandwidth,
                resolution: base.resolution,
                frame_rate,
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Parse playlist text fetched from `source_url` into its variants.
///
/// Order is preserved exactly as declared; nothing is re-sorted.
pub fn parse(manifest: &str, source_url: &str) -> Result<VariantSet, DownloadError> {
    let fields = ManifestFields::tokenize(manifest)?;
    tracing::debug!(
        bandwidths = fields.bandwidths.len(),
        base_urls = fields.base_urls.len(),
        frame_rates = fields.frame_rates.len(),
        audio = ?fields.audio,
        "Tokenized manifest"
    );

    fields.validate()?;
    Ok(fields.into_variants(source_url))
}

/// Directory of the playlist: query dropped, filename stripped
pub fn media_root(source_url: &str) -> String {
    let clean = strip_query(source_url);
    match clean.rfind('/') {
        Some(idx) => clean[..=idx].to_string(),
        None => String::new(),
    }
}

fn parse_frame_rate(num: &str, den: Option<&str>) -> Result<u32, DownloadError> {
    let invalid = || {
        DownloadError::Parse(match den {
            Some(d) => format!("invalid frame rate {:?}/{:?}", num, d),
            None => format!("invalid frame rate {:?}", num),
        })
    };

    let numerator: u32 = num.trim().parse().map_err(|_| invalid())?;
    match den {
        None => Ok(numerator),
        Some(d) => {
            let denominator: u32 = d.trim().parse().map_err(|_| invalid())?;
            if denominator == 0 {
                return Err(invalid());
            }
            Ok((numerator as f64 / denominator as f64).round() as u32)
        }
    }
}
