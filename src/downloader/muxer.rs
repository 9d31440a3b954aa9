// MuxOrchestrator - combines separate audio and video streams with ffmpeg
//
// Both streams are staged to `<jobid>_VID` / `<jobid>_AUD` in the working
// directory, ffmpeg writes `<jobid>_MUX`, and the staged inputs are removed
// on every exit path. The output is handed to the caller as an open file.

use bytes::Bytes;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::MuxError;
use super::models::{MediaPayload, MuxConfig, MuxedFile};
use super::tools::ToolManager;
use super::utils::{new_job_id, run_output_with_timeout, TempFileGuard};

#[derive(Debug, Clone)]
pub struct MuxOrchestrator {
    program: PathBuf,
    work_dir: PathBuf,
    container: String,
    audio_codec: String,
    timeout: Option<Duration>,
}

impl MuxOrchestrator {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        let defaults = MuxConfig::default();
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
            container: defaults.container,
            audio_codec: defaults.audio_codec,
            timeout: defaults.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Build from configuration, locating ffmpeg when no path is set
    pub fn from_config(config: &MuxConfig) -> Self {
        let ffmpeg = ToolManager::new(config.ffmpeg_path.clone()).ffmpeg();
        if !ffmpeg.is_available {
            tracing::warn!("ffmpeg not found, muxing will fail until it is installed");
        }

        Self {
            program: ffmpeg.program(),
            work_dir: config.work_dir.clone(),
            container: config.container.clone(),
            audio_codec: config.audio_codec.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Combine `video` and `audio` into one payload.
    ///
    /// A single present stream is returned as is without touching the
    /// filesystem. With both present the result is a [`MuxedFile`] that
    /// the caller must persist or remove.
    pub async fn mux(
        &self,
        video: Option<Bytes>,
        audio: Option<Bytes>,
    ) -> Result<MediaPayload, MuxError> {
        let (video, audio) = match (video, audio) {
            (None, None) => return Err(MuxError::NoMedia),
            (Some(video), None) => {
                tracing::debug!("No audio stream, skipping mux");
                return Ok(MediaPayload::Bytes(video));
            }
            (None, Some(audio)) => {
                tracing::debug!("No video stream, skipping mux");
                return Ok(MediaPayload::Bytes(audio));
            }
            (Some(video), Some(audio)) => (video, audio),
        };

        tokio::fs::create_dir_all(&self.work_dir).await?;

        let job_id = new_job_id();
        let video_file = TempFileGuard::new(self.job_path(&job_id, "VID"));
        let audio_file = TempFileGuard::new(self.job_path(&job_id, "AUD"));
        let output_file = TempFileGuard::new(self.job_path(&job_id, "MUX"));

        tokio::fs::write(video_file.path(), &video).await?;
        tokio::fs::write(audio_file.path(), &audio).await?;
        tracing::debug!(
            "Staged job {} ({} video bytes, {} audio bytes)",
            job_id,
            video.len(),
            audio.len()
        );

        let args = self.build_args(video_file.path(), audio_file.path(), output_file.path());
        let output = run_output_with_timeout(&self.program, &args, self.timeout)
            .await
            .map_err(|e| {
                MuxError::ProcessFailed(format!("{}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MuxError::ProcessFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let written = tokio::fs::metadata(output_file.path())
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(MuxError::ProcessFailed(format!(
                "{} produced no output",
                self.program.display()
            )));
        }

        let file = tokio::fs::File::open(output_file.path()).await?;
        let path = output_file.disarm();
        tracing::info!("Muxed job {} into {:?} ({} bytes)", job_id, path, written);

        Ok(MediaPayload::Muxed(MuxedFile::new(file, path)))
    }

    fn job_path(&self, job_id: &str, role: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}.{}", job_id, role, self.container))
    }

    /// Copy the video bitstream, convert audio to the target codec
    fn build_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            video.into(),
            "-i".into(),
            audio.into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            self.audio_codec.as_str().into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            output.into(),
        ]
    }
}
