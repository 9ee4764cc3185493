//! Video transformation requests.
//!
//! Tests that actually transcode skip themselves when ffmpeg is not
//! installed.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, TestHarness};
use mf_av::ToolRegistry;

/// Fragmented MP4 output starts with an `ftyp` box.
fn is_mp4(data: &[u8]) -> bool {
    data.len() > 8 && &data[4..8] == b"ftyp"
}

/// Container duration in seconds as reported by ffprobe, or `None` when
/// ffprobe is not installed or cannot tell.
fn media_duration(data: &[u8]) -> Option<f64> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.mp4");
    std::fs::write(&path, data).unwrap();

    let output = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(&path)
        .output()
        .ok()?;
    assert!(output.status.success(), "ffprobe rejected the output");
    let text = String::from_utf8_lossy(&output.stdout);
    match text.trim() {
        // Some ffprobe builds leave fragmented files without a header duration.
        "N/A" => None,
        value => Some(value.parse().expect("ffprobe printed no duration")),
    }
}

#[tokio::test]
async fn planning_errors_fail_before_streaming() {
    let harness = TestHarness::with_tools(ToolRegistry::empty());
    harness.put_asset("clip.mp4", b"placeholder");

    let response = harness.get("/video/upload/so_5,eo_3/clip.mp4").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "operation_error");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn missing_ffmpeg_is_bad_gateway() {
    let harness = TestHarness::with_tools(ToolRegistry::empty());
    harness.put_asset("clip.mp4", b"placeholder");

    let response = harness.get("/video/upload/c_scale,w_64/clip.mp4").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "tool_error");
}

#[tokio::test]
async fn image_only_tags_are_ignored_for_video() {
    let harness = TestHarness::with_tools(ToolRegistry::empty());
    harness.put_asset("clip.mp4", b"placeholder");

    // Background removal is not a video operation, so the chain plans and
    // fails only on the missing tool.
    let response = harness
        .get("/video/upload/e_background_removal/clip.mp4")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn trimmed_clip_streams_as_mp4() {
    let harness = TestHarness::new();
    if !harness.ffmpeg_available() {
        return;
    }
    harness.put_clip("clip.mp4", 3);

    let response = harness
        .get("/video/upload/so_1,du_1/c_scale,w_64/clip.mp4")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    let body = body_bytes(response).await;
    assert!(is_mp4(&body));

    // so_1,du_1 over a 3 second clip keeps one second.
    if let Some(duration) = media_duration(&body) {
        assert!((duration - 1.0).abs() < 0.3, "duration was {duration}");
    }
}

#[tokio::test]
async fn splice_concatenates_second_asset() {
    let harness = TestHarness::new();
    if !harness.ffmpeg_available() {
        return;
    }
    harness.put_clip("main.mp4", 1);
    harness.put_clip("intro.mp4", 1);

    let spliced = body_bytes(
        harness
            .get("/video/upload/fl_splice,l_video:intro.mp4/main.mp4")
            .await,
    )
    .await;
    let single = body_bytes(harness.get("/video/upload/main.mp4").await).await;
    assert!(is_mp4(&spliced));
    assert!(spliced.len() > single.len());
}

#[tokio::test]
async fn missing_splice_asset_is_404() {
    let harness = TestHarness::new();
    if !harness.ffmpeg_available() {
        return;
    }
    harness.put_clip("main.mp4", 1);

    let response = harness
        .get("/video/upload/fl_splice,l_absent.mp4/main.mp4")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corrupt_source_truncates_the_stream() {
    let (harness, addr) = TestHarness::with_server().await;
    if !harness.ffmpeg_available() {
        return;
    }
    harness.put_asset("broken.mp4", b"definitely not a video");

    // Headers are already sent when ffmpeg fails, so the failure shows up as
    // a body error rather than a status code.
    let response = reqwest::get(format!("http://{addr}/video/upload/broken.mp4"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.bytes().await.is_err());
}
