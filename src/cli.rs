use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reddit_downloader::MediaType;

#[derive(Parser)]
#[command(name = "reddit-downloader")]
#[command(author, version, about = "Download Reddit videos within a size limit")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the best fitting rendition of a post
    Download {
        /// Reddit post URL
        url: String,

        /// video, video-only or audio-only
        #[arg(short = 't', long = "type", default_value = "video")]
        media_type: MediaType,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Override the size limit in bytes
        #[arg(long)]
        size_limit: Option<u64>,
    },

    /// Show post metadata and the available renditions
    Info {
        /// Reddit post URL
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg is available
    CheckTools,
}
