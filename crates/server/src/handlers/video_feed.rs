use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use emotion_core::video::domain::multipart;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Parts buffered between the capture loop and the HTTP body.
const STREAM_DEPTH: usize = 2;

/// Live camera feed with emotion overlays.
///
/// GET /video_feed (multipart/x-mixed-replace)
pub async fn video_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let camera = state.camera.clone();
    let lease = tokio::task::spawn_blocking(move || camera.acquire())
        .await
        .map_err(|e| ApiError::internal(e, state.expose_errors))?
        .map_err(|e| {
            log::error!("Camera unavailable: {e}");
            ApiError::service_unavailable("Camera unavailable")
        })?;

    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(STREAM_DEPTH);
    let stream = state.stream.clone();
    tokio::task::spawn_blocking(move || {
        // released when the client goes away or the session stops
        let _lease = lease;
        stream.run(
            || !tx.is_closed(),
            |part| tx.blocking_send(Ok(Bytes::from(part))).is_ok(),
        );
    });

    let headers = [
        (header::CONTENT_TYPE, multipart::CONTENT_TYPE),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    Ok((headers, Body::from_stream(ReceiverStream::new(rx))).into_response())
}
