mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

use reddit_downloader::downloader::format_selector::FormatSelector;
use reddit_downloader::downloader::utils::is_reddit_url;
use reddit_downloader::downloader::{MediaType, PostSnapshot, ToolManager};
use reddit_downloader::{Config, DownloadError, Downloader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reddit_downloader=debug".to_string()
        } else {
            "reddit_downloader=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Download {
            url,
            media_type,
            output,
            size_limit,
        } => {
            let config = match size_limit {
                Some(limit) => config.with_size_limit(limit),
                None => config,
            };
            config.validate().context("Invalid configuration")?;
            download(&config, &url, media_type, &output).await
        }
        Commands::Info { url, json } => info(&config, &url, json).await,
        Commands::CheckTools => check_tools(&config),
    }
}

async fn download(
    config: &Config,
    url: &str,
    media_type: MediaType,
    output: &Path,
) -> Result<()> {
    let downloader = Downloader::new(config)?;

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", output))?;

    let resolved = match downloader.resolve(url, media_type).await {
        Ok(resolved) => resolved,
        Err(e) => return Err(report(e)),
    };
    let dest: PathBuf = output.join(&resolved.file_name);

    let variant = resolved.media.variant.clone();
    resolved
        .media
        .payload
        .persist(&dest)
        .await
        .with_context(|| format!("Failed to write {:?}", dest))?;

    let size = tokio::fs::metadata(&dest).await.map(|m| m.len()).unwrap_or(0);
    println!(
        "Saved {} ({}, {})",
        dest.display(),
        variant,
        FormatSelector::format_size(size)
    );
    Ok(())
}

async fn info(config: &Config, url: &str, json: bool) -> Result<()> {
    if !is_reddit_url(url) {
        return Err(report(DownloadError::InvalidUrl(url.to_string())));
    }

    let downloader = Downloader::new(config)?;
    let post = downloader.fetch_post(url).await.map_err(report)?;
    let variants = match post.dash_url.as_deref() {
        Some(dash_url) => Some(downloader.fetch_variants(dash_url).await.map_err(report)?),
        None => None,
    };

    if json {
        let doc = serde_json::json!({ "post": post, "variants": variants });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print_post(&post);
    match variants {
        Some(variants) => {
            println!("\nRenditions:");
            for (index, variant) in variants.iter().enumerate() {
                println!("  [{}] {}", index, variant);
            }
        }
        None => println!("\nNot a video post"),
    }
    Ok(())
}

fn print_post(snapshot: &PostSnapshot) {
    let post = &snapshot.post;
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());

    println!("Title:      {}", text(&post.title));
    println!("Author:     {}", text(&snapshot.user.username));
    println!("Subreddit:  {}", text(&snapshot.subreddit.name));
    if let Some(subscribers) = snapshot.subreddit.subscribers {
        println!("Subscribers: {}", subscribers);
    }
    println!("Upvotes:    {}", num(post.upvotes));
    println!("Comments:   {}", num(post.comments));
    println!("NSFW:       {}", post.over_18.unwrap_or(false));

    let awards = &snapshot.awards;
    if !awards.items.is_empty() {
        println!(
            "Awards:     {} (cost {} coins, {} days of premium)",
            awards.total_count(),
            awards.total_cost(),
            awards.total_days_premium()
        );
    }
    for warning in &snapshot.warnings {
        tracing::debug!("metadata: {}", warning);
    }
}

fn check_tools(config: &Config) -> Result<()> {
    let ffmpeg = ToolManager::new(config.mux.ffmpeg_path.clone()).ffmpeg();

    if ffmpeg.is_available {
        println!(
            "✓ ffmpeg {} ({})",
            ffmpeg.version.as_deref().unwrap_or("unknown version"),
            ffmpeg.program().display()
        );
        Ok(())
    } else {
        println!("✗ ffmpeg not found");
        anyhow::bail!("ffmpeg is required to mux audio into videos")
    }
}

/// Log the detailed error, hand the user the short one
fn report(err: DownloadError) -> anyhow::Error {
    if err.is_expected() {
        tracing::info!("{}", err);
    } else {
        tracing::error!("{:?}", err);
    }
    anyhow::anyhow!(err.user_message())
}
