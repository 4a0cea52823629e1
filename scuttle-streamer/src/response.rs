use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{Result, StreamError};
use crate::resolve::content_type_for;

/// A parsed `Range: bytes=start-end` header, already validated against the
/// file's actual size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRange {
    pub start: u64,
    pub end: u64,
}

/// Parses a single-range `bytes=start-end` header value (the only form the
/// original player sends). `end` may be omitted (`bytes=1024-`), meaning "to
/// EOF".
pub fn parse_range_header(value: &str, file_size: u64) -> Result<ParsedRange> {
    let value = value.trim();
    let value = value
        .strip_prefix("bytes=")
        .ok_or_else(|| StreamError::InvalidRange(value.to_string()))?;
    let (start_str, end_str) =
        value.split_once('-').ok_or_else(|| StreamError::InvalidRange(value.to_string()))?;

    let start: u64 = start_str.parse().map_err(|_| StreamError::InvalidRange(value.to_string()))?;
    let end: u64 = if end_str.is_empty() {
        file_size.saturating_sub(1)
    } else {
        end_str.parse().map_err(|_| StreamError::InvalidRange(value.to_string()))?
    };

    if file_size == 0 || start >= file_size || end >= file_size || start > end {
        return Err(StreamError::RangeNotSatisfiable);
    }
    Ok(ParsedRange { start, end })
}

/// Builds the byte-range response for an already-resolved audio file path
///: the whole file on a 200 when no `Range` header is present, a 206
/// partial-content response with `Content-Range`/`Content-Length` otherwise.
/// Unlike the commented-out `stream.py` draft, this is the path actually
/// taken in production here — there is no transcoding step to make `FileResponse`
/// preferable over handling ranges ourselves.
pub async fn serve_audio_file(path: &std::path::Path, range: Option<&str>) -> Result<Response> {
    let metadata = tokio::fs::metadata(path).await?;
    let file_size = metadata.len();
    let content_type = content_type_for(path);

    let parsed_range = match range {
        Some(value) => Some(parse_range_header(value, file_size)?),
        None => None,
    };

    let mut file = tokio::fs::File::open(path).await?;

    let Some(parsed_range) = parsed_range else {
        let stream = ReaderStream::new(file);
        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
        return Ok(response);
    };

    let length = parsed_range.end - parsed_range.start + 1;
    file.seek(std::io::SeekFrom::Start(parsed_range.start)).await?;
    let stream = ReaderStream::new(file.take(length));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::PARTIAL_CONTENT;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&format!("bytes {}-{}/{}", parsed_range.start, parsed_range.end, file_size))
            .expect("ascii range header value"),
    );
    Ok(response)
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        let status = match &self {
            StreamError::NotFound(_) => StatusCode::NOT_FOUND,
            StreamError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            StreamError::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            StreamError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_end() {
        let r = parse_range_header("bytes=10-19", 100).unwrap();
        assert_eq!(r, ParsedRange { start: 10, end: 19 });
    }

    #[test]
    fn parses_open_ended_range() {
        let r = parse_range_header("bytes=90-", 100).unwrap();
        assert_eq!(r, ParsedRange { start: 90, end: 99 });
    }

    #[test]
    fn rejects_start_past_eof() {
        assert!(matches!(parse_range_header("bytes=100-199", 100), Err(StreamError::RangeNotSatisfiable)));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(matches!(parse_range_header("chunks=0-10", 100), Err(StreamError::InvalidRange(_))));
    }

    #[tokio::test]
    async fn full_file_response_has_no_content_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let response = serve_audio_file(&path, None).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::CONTENT_RANGE));
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "10");
    }

    #[tokio::test]
    async fn ranged_response_is_partial_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let response = serve_audio_file(&path, Some("bytes=2-5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers().get(header::CONTENT_RANGE).unwrap(), "bytes 2-5/10");
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "4");
    }
}
