//! Line framing for streamed HTTP bodies (NDJSON and server-sent events).

use crate::domain::error::{AppError, Result};
use futures_util::{Stream, StreamExt};
use tracing::debug;

/// Splits a response body into non-empty lines as bytes arrive.
pub(crate) fn lines(
    response: reqwest::Response,
    provider: &'static str,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    AppError::ConnectionFailure(format!("{} stream timed out: {}", provider, e))
                } else {
                    AppError::ConnectionFailure(format!("{} stream interrupted: {}", provider, e))
                }
            })?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    }
}

/// Parsed `data:` payloads of a server-sent event stream, ending at `[DONE]`.
/// Payloads that are not JSON are skipped.
pub(crate) fn sse_events(
    response: reqwest::Response,
    provider: &'static str,
) -> impl Stream<Item = Result<serde_json::Value>> + Send {
    async_stream::try_stream! {
        let mut framed = Box::pin(lines(response, provider));

        while let Some(line) = framed.next().await {
            let line = line?;
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                break;
            }
            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(event) => yield event,
                Err(e) => debug!(provider, error = %e, "Skipping non-JSON stream event"),
            }
        }
    }
}
