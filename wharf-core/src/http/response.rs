use bytes::Bytes;
use http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

/// The response object filled in by the dispatch core. Every dispatch path
/// fully determines status, headers and body before returning; the
/// connection layer only serializes it.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Response {
    /// Set status, body and Content-Type/Content-Length in one step.
    pub fn set(&mut self, status: StatusCode, content_type: &str, body: Bytes) {
        self.status = status;
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self.headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from_str(&body.len().to_string())
                .unwrap_or(HeaderValue::from_static("0")),
        );
        self.body = body;
    }

    /// Insert a header; values that are not legal header text are dropped.
    pub fn insert_header(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }
}
