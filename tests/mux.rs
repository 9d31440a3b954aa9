#![cfg(unix)]

mod common;

use bytes::Bytes;
use serial_test::serial;
use std::time::Duration;

use common::{list_dir, stub_ffmpeg, MUX_FAIL, MUX_OK, MUX_SILENT};
use reddit_downloader::downloader::{MediaPayload, MuxError, MuxOrchestrator};

fn streams() -> (Option<Bytes>, Option<Bytes>) {
    (
        Some(Bytes::from_static(b"video-bytes")),
        Some(Bytes::from_static(b"audio-bytes")),
    )
}

#[tokio::test]
#[serial]
async fn test_mux_success_leaves_only_output() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work);

    let (video, audio) = streams();
    let payload = muxer.mux(video, audio).await.unwrap();

    let MediaPayload::Muxed(muxed) = payload else {
        panic!("expected a muxed payload");
    };
    assert!(muxed.file_name().ends_with("_MUX.mp4"));
    // staged inputs are gone, only the output remains
    assert_eq!(list_dir(&work), vec![muxed.file_name()]);

    let dest = dir.path().join("final.mp4");
    MediaPayload::Muxed(muxed).persist(&dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"muxed");
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_mux_process_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_FAIL), &work);

    let (video, audio) = streams();
    let err = muxer.mux(video, audio).await.unwrap_err();

    match err {
        MuxError::ProcessFailed(msg) => assert!(msg.contains("Invalid data"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(work.exists());
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_mux_empty_output_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_SILENT), &work);

    let (video, audio) = streams();
    let err = muxer.mux(video, audio).await.unwrap_err();
    assert!(matches!(err, MuxError::ProcessFailed(_)));
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_mux_missing_tool() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new("/nonexistent/bin/ffmpeg", &work);

    let (video, audio) = streams();
    let err = muxer.mux(video, audio).await.unwrap_err();
    assert!(matches!(err, MuxError::ProcessFailed(_)));
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_mux_timeout_kills_process() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), "exec sleep 5\n"), &work)
        .with_timeout(Some(Duration::from_millis(200)));

    let (video, audio) = streams();
    let err = muxer.mux(video, audio).await.unwrap_err();
    assert!(matches!(err, MuxError::ProcessFailed(_)));
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_concurrent_jobs_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work);

    let (v1, a1) = streams();
    let (v2, a2) = streams();
    let (first, second) = tokio::join!(muxer.mux(v1, a1), muxer.mux(v2, a2));

    let (MediaPayload::Muxed(first), MediaPayload::Muxed(second)) =
        (first.unwrap(), second.unwrap())
    else {
        panic!("expected muxed payloads");
    };
    assert_ne!(first.path(), second.path());
    assert_eq!(list_dir(&work).len(), 2);

    first.remove().await.unwrap();
    second.remove().await.unwrap();
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_persist_failure_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work);

    let (video, audio) = streams();
    let payload = muxer.mux(video, audio).await.unwrap();
    assert_eq!(list_dir(&work).len(), 1);

    let dest = dir.path().join("missing").join("dir").join("out.mp4");
    assert!(payload.persist(&dest).await.is_err());
    assert!(!dest.exists());
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_dropped_output_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer = MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work);

    let (video, audio) = streams();
    let payload = muxer.mux(video, audio).await.unwrap();
    assert_eq!(list_dir(&work).len(), 1);

    drop(payload);
    assert!(list_dir(&work).is_empty());
}

#[tokio::test]
#[serial]
async fn test_output_extension_follows_container() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let muxer =
        MuxOrchestrator::new(stub_ffmpeg(dir.path(), MUX_OK), &work).with_container("mkv");

    let (video, audio) = streams();
    let payload = muxer.mux(video, audio).await.unwrap();
    assert_eq!(payload.extension().as_deref(), Some("mkv"));
    assert!(payload.into_bytes().await.is_ok());
    assert!(list_dir(&work).is_empty());
}
