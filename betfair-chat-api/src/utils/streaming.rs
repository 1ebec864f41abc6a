//! Newline-delimited JSON responses

use axum::{
    BoxError,
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::stream::Stream;
use serde::Serialize;

pub const NDJSON_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// One JSON document followed by `\n`
pub fn ndjson_line<T: Serialize>(value: &T) -> Bytes {
    let mut line = serde_json::to_vec(value).unwrap_or_default();
    line.push(b'\n');
    Bytes::from(line)
}

pub fn ndjson_response(lines: Vec<Bytes>) -> Response {
    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from(lines.concat()),
    )
        .into_response()
}

/// Stream lines as they are produced.
///
/// An `Err` item aborts the body mid-response, so the client sees a failed
/// read rather than a short but well-formed reply.
pub fn create_ndjson_stream<S, E>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError>,
{
    let body = Body::from_stream(stream);
    ([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response()
}
