use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

const FFMPEG: &str = "ffmpeg";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

impl ToolInfo {
    /// Path to invoke: the located binary, or the bare name as a last resort
    pub fn program(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// Locates the external muxer on this host
pub struct ToolManager {
    configured: Option<PathBuf>,
}

impl ToolManager {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { configured }
    }

    pub fn ffmpeg(&self) -> ToolInfo {
        let path = self.detect_ffmpeg();
        let version = path.as_deref().and_then(Self::get_version);

        ToolInfo {
            name: FFMPEG.to_string(),
            version,
            is_available: path.as_deref().is_some_and(Path::exists),
            path,
        }
    }

    fn detect_ffmpeg(&self) -> Option<PathBuf> {
        // 1. Explicit configuration wins, even if it turns out to be wrong
        if let Some(path) = &self.configured {
            if path.exists() {
                return Some(path.clone());
            }
            if let Ok(found) = which::which(path) {
                return Some(found);
            }
            tracing::warn!("Configured ffmpeg {:?} does not exist", path);
            return Some(path.clone());
        }

        // 2. Common install locations
        let common_paths = [
            format!("/opt/homebrew/bin/{}", FFMPEG),
            format!("/usr/local/bin/{}", FFMPEG),
            format!("/usr/bin/{}", FFMPEG),
        ];

        for path in common_paths {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 3. PATH
        which::which(FFMPEG).ok()
    }

    fn get_version(path: &Path) -> Option<String> {
        match Command::new(path).arg("-version").output() {
            Ok(output) if output.status.success() => {
                // "ffmpeg version 6.1.1 Copyright (c) ..." -> "6.1.1"
                let out = String::from_utf8_lossy(&output.stdout);
                let first = out.lines().next()?;
                first
                    .strip_prefix("ffmpeg version ")
                    .and_then(|rest| rest.split_whitespace().next())
                    .map(|v| v.to_string())
                    .or_else(|| Some(first.trim().to_string()))
            }
            _ => None,
        }
    }
}
