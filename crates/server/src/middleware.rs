//! HTTP middleware.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Logs method, path, status and latency of every request except `/health`.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    if uri.path() != "/health" {
        log::info!(
            "{method} {} -> {} ({} ms)",
            uri.path(),
            response.status().as_u16(),
            start.elapsed().as_millis()
        );
    }

    response
}
