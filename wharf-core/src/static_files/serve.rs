use std::path::Path;

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use httpdate::fmt_http_date;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::http::Response;

const MAX_STATIC_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MiB

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("file not found")]
    NotFound,
    #[error("file not readable")]
    Forbidden,
    #[error("i/o error while reading file")]
    Io,
}

/// Read a resolved file from disk and fill the response: status 200,
/// extension-derived Content-Type, Content-Length and Last-Modified.
///
/// The path has already passed containment checks; this only guards
/// against the file changing underneath us between resolve and read.
pub async fn serve_file(path: &Path, res: &mut Response) -> Result<(), ServeError> {
    let metadata = fs::metadata(path).await.map_err(|_| ServeError::NotFound)?;

    if !metadata.is_file() {
        return Err(ServeError::NotFound);
    }

    // Guard against memory exhaustion on oversized files.
    if metadata.len() > MAX_STATIC_FILE_SIZE {
        return Err(ServeError::Forbidden);
    }

    let mut file = fs::File::open(path).await.map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ServeError::NotFound,
        std::io::ErrorKind::PermissionDenied => ServeError::Forbidden,
        _ => ServeError::Io,
    })?;

    let mut buf = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut buf).await.map_err(|_| ServeError::Io)?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    res.set(StatusCode::OK, mime.as_ref(), Bytes::from(buf));

    if let Some(modified) = metadata.modified().ok().map(fmt_http_date) {
        if let Ok(value) = HeaderValue::from_str(&modified) {
            res.headers.insert(http::header::LAST_MODIFIED, value);
        }
    }

    Ok(())
}
