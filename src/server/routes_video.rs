//! Video delivery routes.
//!
//! `/get_video` produces and serves the cached artifact, `/git_video`
//! live-transcodes straight to the client, `/videos/{filename}` serves
//! previously produced artifacts.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppContext;
use crate::pipeline::error::PipelineError;
use crate::storage::VideoId;
use crate::streaming;

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    video_id: Option<String>,
}

/// Download and transcode a video, then serve the cached artifact.
///
/// Replies 202 while another request is producing the same identifier.
pub async fn get_video(
    State(ctx): State<AppContext>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Response {
    let id = match parse_video_id(query.video_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    // Production runs on its own task: a client that disconnects mid-build
    // must not abort it, since the artifact is cached for future requests.
    let pipeline = ctx.pipeline.clone();
    let produce_id = id.clone();
    let produced = tokio::spawn(async move { pipeline.ensure_cached(&produce_id).await }).await;

    match produced {
        Ok(Ok(artifact)) => {
            streaming::serve_file(&artifact.path, "video/webm", range_header(&headers))
                .await
                .into_response()
        }
        Ok(Err(e)) => error_response(e),
        Err(join_error) => {
            tracing::error!(id = %id, error = %join_error, "production task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Live-transcode a video to FLV, streamed as it is encoded.
///
/// A `Range: bytes=<start>-` header is honored as an approximate seek;
/// the response itself is unseekable (chunked, no length).
pub async fn git_video(
    State(ctx): State<AppContext>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Response {
    let id = match parse_video_id(query.video_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let offset = range_header(&headers).map(range_start_offset).unwrap_or(0);

    match ctx.pipeline.stream_live(&id, offset).await {
        Ok(live) => {
            let body = Body::from_stream(streaming::relay(live));
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "video/x-flv")
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CACHE_CONTROL, "no-cache")
                .body(body)
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) => error_response(e),
    }
}

/// Serve a previously produced artifact by file name, cache directory
/// first, then the download directory.
pub async fn serve_video(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    match ctx.pipeline.storage().resolve_serve_path(&filename) {
        Some(path) => {
            let content_type = streaming::content_type_for_path(&path);
            streaming::serve_file(&path, content_type, range_header(&headers))
                .await
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn parse_video_id(raw: Option<&str>) -> Result<VideoId, Response> {
    let raw = raw.ok_or_else(|| {
        (StatusCode::BAD_REQUEST, "Missing video_id parameter").into_response()
    })?;
    VideoId::new(raw).map_err(|_| {
        (StatusCode::BAD_REQUEST, "Invalid video_id parameter").into_response()
    })
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|h| h.to_str().ok())
}

/// Start offset of a `bytes=<start>-` header; unparseable input means
/// start-of-stream.
fn range_start_offset(header: &str) -> u64 {
    header
        .strip_prefix("bytes=")
        .and_then(|rest| rest.split('-').next())
        .and_then(|start| start.trim().parse().ok())
        .unwrap_or(0)
}

fn error_response(e: PipelineError) -> Response {
    match e {
        PipelineError::InFlight(_) => (
            StatusCode::ACCEPTED,
            "Video is being processed, please try again later",
        )
            .into_response(),
        PipelineError::InvalidRequest(message) => {
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        PipelineError::Resolution(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to download video").into_response()
        }
        PipelineError::Transcode(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to convert video").into_response()
        }
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
        PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_start_offset() {
        assert_eq!(range_start_offset("bytes=192000-"), 192_000);
        assert_eq!(range_start_offset("bytes=0-"), 0);
        assert_eq!(range_start_offset("bytes=500-999"), 500);
        assert_eq!(range_start_offset("bytes=-500"), 0);
        assert_eq!(range_start_offset("garbage"), 0);
    }
}
