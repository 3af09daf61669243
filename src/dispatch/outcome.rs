//! Request outcomes: status, headers and a body that may stream from disk.

use std::io;

use axum::body::Body;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read size for streamed files.
const CHUNK_SIZE: usize = 16 * 1024;

/// Response body produced by the dispatcher.
#[derive(Debug)]
pub enum OutcomeBody {
    Empty,
    Bytes(Bytes),
    /// An open file, streamed chunk by chunk when the response is written.
    File(File),
}

/// Status and body for one request.
#[derive(Debug)]
pub struct Outcome {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: OutcomeBody,
}

impl Outcome {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            headers: HeaderMap::new(),
            body: OutcomeBody::Empty,
        }
    }

    /// 200 with the given text, or an empty 200 for `None`.
    pub fn text(value: Option<String>) -> Self {
        let mut outcome = Self::new(StatusCode::OK);
        if let Some(value) = value {
            outcome.body = OutcomeBody::Bytes(Bytes::from(value));
        }
        outcome
    }

    pub fn file(file: File, content_type: Option<&str>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.map(str::to_string),
            headers: HeaderMap::new(),
            body: OutcomeBody::File(file),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// 500 carrying the error detail in the body.
    pub fn server_error(detail: String) -> Self {
        let mut outcome = Self::new(StatusCode::INTERNAL_SERVER_ERROR);
        outcome.body = OutcomeBody::Bytes(Bytes::from(detail));
        outcome
    }

    /// Drain the body into memory.
    #[cfg(test)]
    pub(crate) async fn read_body(self) -> io::Result<Bytes> {
        match self.body {
            OutcomeBody::Empty => Ok(Bytes::new()),
            OutcomeBody::Bytes(bytes) => Ok(bytes),
            OutcomeBody::File(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

fn file_stream(file: File) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        let read = file.read_buf(&mut buf).await?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some((buf.freeze(), file)))
        }
    })
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let body = match self.body {
            OutcomeBody::Empty => Body::empty(),
            OutcomeBody::Bytes(bytes) => Body::from(bytes),
            OutcomeBody::File(file) => Body::from_stream(file_stream(file)),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.extend(self.headers);
        if let Some(content_type) = self.content_type {
            match HeaderValue::from_str(&content_type) {
                Ok(value) => {
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(_) => {
                    tracing::warn!(%content_type, "Dropping invalid content type");
                }
            }
        }
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_outcome_response() {
        let response = Outcome::text(Some("1.0".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], b"1.0");
    }

    #[tokio::test]
    async fn test_empty_text_outcome_is_ok() {
        let response = Outcome::text(None).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_file_outcome_streams_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let contents: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &contents).unwrap();

        let file = File::open(&path).await.unwrap();
        let response = Outcome::file(file, Some("application/octet-stream")).into_response();

        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/octet-stream"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), contents.len());
        assert_eq!(&body[..], &contents[..]);
    }

    #[tokio::test]
    async fn test_server_error_carries_detail() {
        let response = Outcome::server_error("boom".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], b"boom");
    }
}
