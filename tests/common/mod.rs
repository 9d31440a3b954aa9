#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Stand-in for ffmpeg that writes "muxed" to its last argument
pub const MUX_OK: &str = "for last; do :; done\nprintf muxed > \"$last\"\n";
/// Exits non-zero without writing anything
pub const MUX_FAIL: &str = "echo 'Invalid data found when processing input' >&2\nexit 1\n";
/// Exits zero but leaves no output behind
pub const MUX_SILENT: &str = "exit 0\n";

/// Write an executable shell script named `ffmpeg` into `dir`
#[cfg(unix)]
pub fn stub_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// File names currently in `dir`, sorted
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

pub fn video_rep(bandwidth: u64, frame_rate: &str, base_url: &str) -> String {
    format!(
        r#"<Representation bandwidth="{}" codecs="avc1.4d401f" frameRate="{}" height="720" id="VIDEO" mimeType="video/mp4" startWithSAP="1" width="1280"><BaseURL>{}</BaseURL></Representation>"#,
        bandwidth, frame_rate, base_url
    )
}

/// A playlist with the given video representations and a DASH_audio track
pub fn playlist(reps: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD mediaPresentationDuration="PT9.4S" minBufferTime="PT1.5S" type="static">
<Period duration="PT9.4S">
<AdaptationSet contentType="video" maxFrameRate="30" segmentAlignment="true">
{}
</AdaptationSet>
<AdaptationSet contentType="audio" lang="en">
<Representation audioSamplingRate="48000" bandwidth="130029" codecs="mp4a.40.2" id="AUDIO" mimeType="audio/mp4"><BaseURL>DASH_audio.mp4</BaseURL></Representation>
</AdaptationSet>
</Period>
</MPD>"#,
        reps.join("\n")
    )
}
