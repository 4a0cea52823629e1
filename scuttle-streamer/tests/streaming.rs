use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use scuttle_streamer::{resolve_audio_path, serve_audio_file, StreamError};

async fn track_handler(State(download_dir): State<Arc<std::path::PathBuf>>, AxumPath(id): AxumPath<String>, headers: HeaderMap) -> Response {
    let Some(path) = resolve_audio_path(&download_dir, &id) else {
        return axum::response::IntoResponse::into_response(StreamError::NotFound(id));
    };
    let range = headers.get(axum::http::header::RANGE).and_then(|v| v.to_str().ok());
    match serve_audio_file(&path, range).await {
        Ok(response) => response,
        Err(e) => axum::response::IntoResponse::into_response(e),
    }
}

fn app(download_dir: std::path::PathBuf) -> Router {
    Router::new().route("/tracks/{id}", get(track_handler)).with_state(Arc::new(download_dir))
}

#[tokio::test]
async fn missing_track_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(dir.path().to_path_buf());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let resp = reqwest_like_get(addr, "/tracks/nope", None).await;
    assert_eq!(resp.0, StatusCode::NOT_FOUND.as_u16());
}

#[tokio::test]
async fn present_track_supports_range_requests() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("abc.opus"), b"0123456789").unwrap();
    let router = app(dir.path().to_path_buf());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let full = reqwest_like_get(addr, "/tracks/abc", None).await;
    assert_eq!(full.0, StatusCode::OK.as_u16());
    assert_eq!(full.1, b"0123456789");

    let partial = reqwest_like_get(addr, "/tracks/abc", Some("bytes=2-5")).await;
    assert_eq!(partial.0, StatusCode::PARTIAL_CONTENT.as_u16());
    assert_eq!(partial.1, b"2345");
}

/// Minimal hand-rolled HTTP/1.1 client over a raw TCP socket: avoids pulling
/// in a second HTTP client crate just for these two tests.
async fn reqwest_like_get(addr: std::net::SocketAddr, path: &str, range: Option<&str>) -> (u16, Vec<u8>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let mut request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    if let Some(range) = range {
        request.push_str(&format!("Range: {range}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let text = String::from_utf8_lossy(&raw);
    let status_line = text.lines().next().unwrap();
    let status: u16 = status_line.split_whitespace().nth(1).unwrap().parse().unwrap();

    let split_at = raw.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4).unwrap_or(raw.len());
    (status, raw[split_at..].to_vec())
}
