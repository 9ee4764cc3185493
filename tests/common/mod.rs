//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] over a
//! temporary storage directory. [`TestHarness::with_server`] starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use mf_av::ToolRegistry;
use mf_core::config::Config;
use mf_server::context::AppContext;
use mf_server::router::build_router;
use mf_server::storage::FsAssetSource;

/// Test harness wrapping an [`AppContext`] whose assets live in a temp dir.
pub struct TestHarness {
    pub ctx: AppContext,
    pub storage: TempDir,
}

impl TestHarness {
    /// Default configuration with discovered tools.
    pub fn new() -> Self {
        Self::with_tools(ToolRegistry::discover(&Default::default()))
    }

    /// Default configuration with an explicit tool registry.
    pub fn with_tools(tools: ToolRegistry) -> Self {
        let storage = tempfile::tempdir().expect("failed to create storage dir");
        let mut config = Config::default();
        config.storage.root = storage.path().to_path_buf();

        let assets = Arc::new(FsAssetSource::new(storage.path()));
        let ctx = AppContext::new(config, tools, assets);
        Self { ctx, storage }
    }

    pub fn ffmpeg_available(&self) -> bool {
        self.ctx.tools.is_available("ffmpeg")
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    /// Send a GET through the router in-process.
    pub async fn get(&self, uri: &str) -> Response {
        self.router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Store `data` under `name` in the harness storage.
    pub fn put_asset(&self, name: &str, data: &[u8]) {
        std::fs::write(self.storage.path().join(name), data).expect("failed to write asset");
    }

    /// Store a solid-colour JPEG of the given size.
    pub fn put_jpeg(&self, name: &str, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
        img.save_with_format(self.storage.path().join(name), image::ImageFormat::Jpeg)
            .expect("failed to write jpeg");
    }

    /// Generate a short test clip with audio using ffmpeg.
    pub fn put_clip(&self, name: &str, seconds: u32) {
        generate_clip(&self.storage.path().join(name), seconds);
    }

    /// Start the router on a random port.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = harness.serve().await;
        (harness, addr)
    }

    pub async fn serve(&self) -> SocketAddr {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }
}

/// Collect a response body.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Collect a JSON error body.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body is not JSON")
}

fn generate_clip(path: &Path, seconds: u32) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i", "testsrc=size=160x120:rate=10"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=44100"])
        .args(["-t", &seconds.to_string()])
        .args(["-c:v", "mpeg4", "-c:a", "aac", "-pix_fmt", "yuv420p"])
        .arg(path)
        .status()
        .expect("failed to run ffmpeg");
    assert!(status.success(), "ffmpeg failed to generate {}", path.display());
}
