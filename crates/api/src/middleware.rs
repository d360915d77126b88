use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::context::RequestContext;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Longest client-supplied correlation id that is echoed back.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Attach a correlation id, log request start/completion, and report the
/// handling time in seconds via `X-Process-Time`.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let correlation_id =
        extract_correlation_id(req.headers()).unwrap_or_else(|| Uuid::now_v7().to_string());
    req.extensions_mut()
        .insert(RequestContext::new(correlation_id.clone()));

    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        correlation_id = %correlation_id,
    );

    async move {
        let started = Instant::now();
        info!("request started");

        let mut response = next.run(req).await;

        let elapsed = started.elapsed();
        info!(
            status = response.status().as_u16(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request completed"
        );

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            headers.insert(CORRELATION_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
            headers.insert(PROCESS_TIME_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

fn extract_correlation_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CORRELATION_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_CORRELATION_ID_LEN {
        return None;
    }
    Some(value.to_string())
}
