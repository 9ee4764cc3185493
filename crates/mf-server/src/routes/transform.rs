//! The transformation endpoint.
//!
//! `GET /<domain>/upload/<segments...>/<publicId>` parses the path, routes
//! by domain and MIME type, reads the asset and renders it. Images come back
//! as a single body; videos stream as ffmpeg produces them.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use tracing::{debug, info};

use mf_av::TranscodeOutcome;
use mf_pipeline::Rendered;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// GET /{*path}
pub async fn transform(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    uri: Uri,
) -> Response {
    let raw = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    match render(&ctx, raw).await {
        Ok(response) => response,
        Err(e) => AppError::new(e).with_request_id(request_id).into_response(),
    }
}

async fn render(ctx: &AppContext, raw: &str) -> mf_core::Result<Response> {
    let (domain, asset, chain) = mf_parser::parse(raw)?.into_parts();
    debug!(
        domain = domain.as_deref().unwrap_or(""),
        asset = %asset,
        operations = chain.len(),
        "Parsed transformation URL"
    );

    let route = ctx.dispatcher.route(domain.as_deref(), &asset)?;
    let source = ctx.assets.read_asset(asset.public_id()).await?;
    let rendered = ctx
        .dispatcher
        .execute(route, source, &chain, ctx.assets.as_ref())
        .await?;

    match rendered {
        Rendered::Image { mime, bytes } => {
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime)], bytes).into_response())
        }
        Rendered::Video { mime, job } => {
            let (sink, stream) = ctx.dispatcher.video().sink();
            tokio::spawn(async move {
                match job.run(sink).await {
                    TranscodeOutcome::Completed { bytes } => {
                        info!("Video stream complete ({bytes} bytes)");
                    }
                    TranscodeOutcome::Cancelled { bytes } => {
                        debug!("Video stream cancelled by client after {bytes} bytes");
                    }
                    TranscodeOutcome::Failed => {}
                }
            });

            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime)],
                Body::from_stream(stream),
            )
                .into_response())
        }
    }
}
