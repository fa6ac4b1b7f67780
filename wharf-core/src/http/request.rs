use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::http::normalize_path;

/// A fully parsed request handed in by the connection layer. Immutable
/// input to the dispatch core.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Normalized path, query string stripped.
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    /// Build a request from a raw request target ("/search?q=x"). The path
    /// is normalized; the query string is kept verbatim.
    pub fn new(method: Method, target: &str, headers: HeaderMap, body: Bytes) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };

        Self {
            method,
            path: normalize_path(path),
            query: query.to_string(),
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header(http::header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse().ok())
    }

    /// Boundary token from a `multipart/form-data` Content-Type, if any.
    pub fn multipart_boundary(&self) -> Option<&str> {
        let content_type = self.content_type()?;

        if !content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
        {
            return None;
        }

        content_type.split(';').find_map(|param| {
            let (key, value) = param.trim().split_once('=')?;
            if key.trim().eq_ignore_ascii_case("boundary") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
    }
}
