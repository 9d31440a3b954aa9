mod common;

use serde_json::json;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{playlist, video_rep};
use reddit_downloader::downloader::{
    DownloadError, Downloader, MediaType, MuxOrchestrator, NetworkConfig, WebClient,
};

fn downloader(size_limit: u64, muxer: MuxOrchestrator) -> Downloader {
    let client = WebClient::new(&NetworkConfig::default()).unwrap();
    Downloader::with_client(client, muxer, size_limit).with_subreddit_stats(false)
}

fn no_muxer() -> MuxOrchestrator {
    MuxOrchestrator::new("/nonexistent/ffmpeg", "/nonexistent/work")
}

async fn serve(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Playlist with 360p and 720p renditions; 360p is 1 KB, 720p is 5 KB
async fn video_server() -> MockServer {
    let server = MockServer::start().await;
    let manifest = playlist(&[
        video_rep(500_000, "30", "DASH_360.mp4"),
        video_rep(1_500_000, "30", "DASH_720.mp4"),
    ]);

    serve(
        &server,
        "/abc123/DASHPlaylist.mpd",
        ResponseTemplate::new(200).set_body_string(manifest),
    )
    .await;
    serve(
        &server,
        "/abc123/DASH_360.mp4",
        ResponseTemplate::new(200).set_body_bytes(vec![3u8; 1_000]),
    )
    .await;
    serve(
        &server,
        "/abc123/DASH_720.mp4",
        ResponseTemplate::new(200).set_body_bytes(vec![7u8; 5_000]),
    )
    .await;
    server
}

#[tokio::test]
async fn test_fetch_variants_from_playlist() {
    let server = video_server().await;
    let dl = downloader(8_000_000, no_muxer());

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd?a=1&v=1&f=sd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();

    assert_eq!(variants.len(), 2);
    let first = variants.get(0).unwrap();
    assert_eq!(first.url, format!("{}/abc123/DASH_360.mp4", server.uri()));
    assert_eq!(first.resolution, 360);
    assert_eq!(first.bandwidth, 500_000);
    assert_eq!(
        first.audio_url.as_deref(),
        Some(format!("{}/abc123/DASH_audio.mp4", server.uri()).as_str())
    );
    assert_eq!(variants.get(1).unwrap().resolution, 720);
}

#[tokio::test]
async fn test_video_only_within_budget() {
    let server = video_server().await;
    let dl = downloader(2_000, no_muxer());

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();
    let media = dl
        .download_variants(&variants, MediaType::VideoOnly)
        .await
        .unwrap();

    assert_eq!(media.index, 0);
    assert_eq!(media.variant.resolution, 360);
    let bytes = media.payload.into_bytes().await.unwrap();
    assert_eq!(bytes.len(), 1_000);
}

#[tokio::test]
async fn test_video_without_audio_degrades() {
    // DASH_audio.mp4 is not served: the audio fetch fails with 404
    let server = video_server().await;
    let dl = downloader(8_000_000, no_muxer());

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();
    let media = dl
        .download_variants(&variants, MediaType::Video)
        .await
        .unwrap();

    assert_eq!(media.variant.resolution, 720);
    assert!(!media.payload.is_muxed());
    assert_eq!(media.payload.into_bytes().await.unwrap().len(), 5_000);
}

#[tokio::test]
async fn test_audio_only() {
    let server = video_server().await;
    serve(
        &server,
        "/abc123/DASH_audio.mp4",
        ResponseTemplate::new(200).set_body_bytes(b"aac-audio".to_vec()),
    )
    .await;
    let dl = downloader(8_000_000, no_muxer());

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();
    let media = dl
        .download_variants(&variants, MediaType::AudioOnly)
        .await
        .unwrap();

    assert_eq!(media.index, 1);
    assert_eq!(&media.payload.into_bytes().await.unwrap()[..], b"aac-audio");
}

#[tokio::test]
async fn test_nothing_fits_budget() {
    let server = video_server().await;
    let dl = downloader(100, no_muxer());

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();
    let err = dl
        .download_variants(&variants, MediaType::Video)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::NoFit { budget: 100 }));
    assert_eq!(err.user_message(), "File is too large for the size budget of 0.00 MB");
}

#[tokio::test]
async fn test_inconsistent_playlist_is_rejected() {
    let server = MockServer::start().await;
    let broken = playlist(&[
        video_rep(500_000, "30", "DASH_360.mp4"),
        // base URL outside the resolution buckets: bandwidth has no partner
        video_rep(900_000, "30", "DASH_96.mp4"),
    ]);
    serve(
        &server,
        "/abc123/DASHPlaylist.mpd",
        ResponseTemplate::new(200).set_body_string(broken),
    )
    .await;

    let dl = downloader(8_000_000, no_muxer());
    let err = dl
        .fetch_variants(&format!("{}/abc123/DASHPlaylist.mpd", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DownloadError::InconsistentManifest {
            bandwidths: 2,
            urls: 1,
            frame_rates: 2
        }
    ));
}

#[tokio::test]
async fn test_missing_playlist_is_fetch_error() {
    let server = MockServer::start().await;
    let dl = downloader(8_000_000, no_muxer());

    let err = dl
        .fetch_variants(&format!("{}/gone/DASHPlaylist.mpd", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Fetch(_)));
    assert_eq!(err.user_message(), "Failed to download video");
}

#[tokio::test]
async fn test_fetch_post_listing() {
    let server = MockServer::start().await;
    let listing = json!([
        {
            "kind": "Listing",
            "data": { "children": [ { "kind": "t3", "data": {
                "title": "Dog rides a skateboard",
                "author": "sk8dog",
                "subreddit": "videos",
                "ups": 1234,
                "media": { "reddit_video": {
                    "dash_url": "https://v.redd.it/abc123/DASHPlaylist.mpd?a=1&v=1&f=sd"
                } }
            } } ] }
        },
        { "kind": "Listing", "data": { "children": [] } }
    ]);
    serve(
        &server,
        "/r/videos/comments/xyz/dog_rides_a_skateboard/.json",
        ResponseTemplate::new(200).set_body_json(listing),
    )
    .await;

    let dl = downloader(8_000_000, no_muxer());
    let post_url = format!(
        "{}/r/videos/comments/xyz/dog_rides_a_skateboard/?utm_source=share",
        server.uri()
    );
    let post = dl.fetch_post(&post_url).await.unwrap();

    assert_eq!(post.post.title.as_deref(), Some("Dog rides a skateboard"));
    assert_eq!(post.user.username.as_deref(), Some("sk8dog"));
    assert_eq!(post.post.upvotes, Some(1234));
    assert_eq!(
        post.dash_url.as_deref(),
        Some("https://v.redd.it/abc123/DASHPlaylist.mpd")
    );
}

#[tokio::test]
async fn test_fetch_post_rejects_empty_body() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/r/videos/comments/xyz/t/.json",
        ResponseTemplate::new(200).set_body_string(""),
    )
    .await;

    let dl = downloader(8_000_000, no_muxer());
    let err = dl
        .fetch_post(&format!("{}/r/videos/comments/xyz/t/", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Metadata(_)));
}

#[cfg(unix)]
#[tokio::test]
#[serial_test::serial]
async fn test_video_with_audio_is_muxed() {
    use common::{list_dir, stub_ffmpeg, MUX_OK};

    let server = video_server().await;
    serve(
        &server,
        "/abc123/DASH_audio.mp4",
        ResponseTemplate::new(200).set_body_bytes(b"aac-audio".to_vec()),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work);
    let dl = downloader(8_000_000, muxer);

    let dash_url = format!("{}/abc123/DASHPlaylist.mpd", server.uri());
    let variants = dl.fetch_variants(&dash_url).await.unwrap();
    let media = dl
        .download_variants(&variants, MediaType::Video)
        .await
        .unwrap();

    assert_eq!(media.variant.resolution, 720);
    assert!(media.payload.is_muxed());

    let dest = dir.path().join("dog.mp4");
    media.payload.persist(&dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"muxed");
    assert!(list_dir(&work).is_empty());
}
