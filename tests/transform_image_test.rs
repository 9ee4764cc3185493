//! Image transformation requests through the full router.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, TestHarness};

fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("response is not an image");
    (img.width(), img.height())
}

#[tokio::test]
async fn fill_resizes_to_exact_box() {
    let harness = TestHarness::new();
    harness.put_jpeg("photo.jpg", 640, 480);

    let response = harness
        .get("/image/upload/c_fill,w_200,h_200/photo.jpg")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(dimensions(&body_bytes(response).await), (200, 200));
}

#[tokio::test]
async fn segments_apply_in_order() {
    let harness = TestHarness::new();
    harness.put_jpeg("photo.jpg", 400, 200);

    let response = harness
        .get("/image/upload/c_crop,w_100,h_100,x_0,y_0/c_scale,w_50/photo.jpg")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dimensions(&body_bytes(response).await), (50, 50));

    // Scaling first leaves a 50x25 image that cannot hold a 100x100 crop.
    let response = harness
        .get("/image/upload/c_scale,w_50/c_crop,w_100,h_100,x_0,y_0/photo.jpg")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "operation_error");
}

#[tokio::test]
async fn unknown_tags_do_not_change_the_result() {
    let harness = TestHarness::new();
    harness.put_jpeg("photo.jpg", 320, 240);

    let plain = body_bytes(harness.get("/image/upload/c_pad,w_100,h_100/photo.jpg").await).await;
    let noisy = body_bytes(
        harness
            .get("/image/upload/e_sepia/c_pad,w_100,h_100,zz_1/photo.jpg")
            .await,
    )
    .await;
    assert_eq!(plain, noisy);
    assert_eq!(dimensions(&plain), (100, 100));
}

#[tokio::test]
async fn empty_chain_returns_source_bytes() {
    let harness = TestHarness::new();
    harness.put_jpeg("photo.jpg", 32, 32);
    let source = std::fs::read(harness.storage.path().join("photo.jpg")).unwrap();

    let response = harness.get("/image/upload/photo.jpg?cache=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, source);
}

#[tokio::test]
async fn quality_directive_keeps_asset_content_type() {
    let harness = TestHarness::new();
    let img = image::RgbaImage::from_pixel(64, 64, image::Rgba([10, 200, 10, 255]));
    img.save(harness.storage.path().join("logo.png")).unwrap();

    let response = harness.get("/image/upload/q_40/logo.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let body = body_bytes(response).await;
    assert_eq!(image::guess_format(&body).unwrap(), image::ImageFormat::Jpeg);
}

#[tokio::test]
async fn background_removal_encodes_png() {
    let harness = TestHarness::new();
    harness.put_jpeg("photo.jpg", 48, 48);

    let response = harness
        .get("/image/upload/e_background_removal/photo.jpg")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let body = body_bytes(response).await;
    assert_eq!(image::guess_format(&body).unwrap(), image::ImageFormat::Png);
    assert_eq!(dimensions(&body), (48, 48));
}

#[tokio::test]
async fn missing_upload_delimiter_is_malformed() {
    let harness = TestHarness::new();
    let response = harness.get("/image/c_fill,w_200/photo.jpg").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "malformed_url");
}

#[tokio::test]
async fn unknown_domain_is_rejected_before_reading() {
    let harness = TestHarness::new();
    let response = harness.get("/audio/upload/song.jpg").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "unsupported_type");
}

#[tokio::test]
async fn unresolvable_mime_is_rejected() {
    let harness = TestHarness::new();
    harness.put_asset("blob.xyz", b"data");
    let response = harness.get("/image/upload/blob.xyz").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "unsupported_media");
}

#[tokio::test]
async fn missing_asset_is_404() {
    let harness = TestHarness::new();
    let response = harness.get("/image/upload/c_fill,w_10,h_10/none.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn corrupt_source_is_an_operation_error() {
    let harness = TestHarness::new();
    harness.put_asset("broken.jpg", b"not really a jpeg");
    let response = harness.get("/image/upload/c_fill,w_10,h_10/broken.jpg").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "operation_error");
}

#[tokio::test]
async fn served_over_http() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.put_jpeg("photo.jpg", 640, 480);

    let response = reqwest::get(format!("http://{addr}/image/upload/ar_1,w_120/photo.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response.bytes().await.unwrap();
    assert_eq!(dimensions(&body), (120, 120));

    let health = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn oversized_output_is_rejected_and_server_keeps_running() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.put_jpeg("photo.jpg", 16, 16);

    let response = reqwest::get(format!(
        "http://{addr}/image/upload/c_fill,w_60000,h_60000/photo.jpg"
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
    assert_eq!(json["code"], "operation_error");

    let response = reqwest::get(format!("http://{addr}/image/upload/c_fill,w_8,h_8/photo.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}
