//! `multipart/form-data` body parsing for upload locations.
//!
//! Matching is exact-boundary-token based and anchored at line starts, so
//! boundary-like byte sequences embedded in binary content never truncate a
//! part. The input body is never mutated; part contents are copied out.

use bytes::Bytes;

/// One extracted file part. Ephemeral, scoped to a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartData {
    pub filename: String,
    pub content: Bytes,
    pub is_valid: bool,
}

impl MultipartData {
    fn invalid() -> Self {
        Self {
            filename: String::new(),
            content: Bytes::new(),
            is_valid: false,
        }
    }
}

/// Split `body` into parts delimited by `--boundary` markers and extract a
/// record per part.
///
/// A body with zero parts, or with no closing `--boundary--` terminator,
/// yields invalid records rather than an error; the caller decides the
/// response.
pub fn parse_parts(body: &[u8], boundary: &str) -> Vec<MultipartData> {
    if boundary.is_empty() {
        return vec![MultipartData::invalid()];
    }

    let delimiter = format!("--{boundary}").into_bytes();
    let markers = find_markers(body, &delimiter);
    let terminated = markers.iter().any(|m| m.terminator);

    let mut parts = Vec::new();
    for window in markers.windows(2) {
        let (current, next) = (&window[0], &window[1]);
        if current.terminator {
            break;
        }

        let start = current.line_end;
        let mut end = next.start;

        // The CRLF immediately preceding the next boundary belongs to the
        // boundary line, not the part content.
        if body[start..end].ends_with(b"\r\n") {
            end -= 2;
        } else if body[start..end].ends_with(b"\n") {
            end -= 1;
        }

        let mut part = parse_part(&body[start..end]);
        if !terminated {
            part.is_valid = false;
        }
        parts.push(part);
    }

    if parts.is_empty() {
        return vec![MultipartData::invalid()];
    }

    parts
}

struct Marker {
    start: usize,
    /// Index just past the marker line (or past `--` for the terminator).
    line_end: usize,
    terminator: bool,
}

/// Locate every occurrence of the delimiter that is anchored at a line
/// start and followed by either a line break (part boundary) or `--`
/// (terminator). Anything else is content that merely resembles a boundary.
fn find_markers(body: &[u8], delimiter: &[u8]) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut from = 0;

    while let Some(offset) = find_subslice(&body[from..], delimiter) {
        let start = from + offset;
        let after = start + delimiter.len();
        let at_line_start = start == 0 || body[start - 1] == b'\n';

        if at_line_start {
            if body[after..].starts_with(b"--") {
                markers.push(Marker {
                    start,
                    line_end: after + 2,
                    terminator: true,
                });
            } else if body[after..].starts_with(b"\r\n") {
                markers.push(Marker {
                    start,
                    line_end: after + 2,
                    terminator: false,
                });
            } else if body[after..].starts_with(b"\n") {
                markers.push(Marker {
                    start,
                    line_end: after + 1,
                    terminator: false,
                });
            }
        }

        from = after;
    }

    markers
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse one part: a header block terminated by a blank line, then the
/// content bytes. Parts without a filename attribute or without a body are
/// invalid.
fn parse_part(raw: &[u8]) -> MultipartData {
    let Some((headers, content)) = split_headers(raw) else {
        return MultipartData::invalid();
    };

    let Ok(headers) = std::str::from_utf8(headers) else {
        return MultipartData::invalid();
    };

    let Some(filename) = extract_filename(headers) else {
        return MultipartData::invalid();
    };

    if content.is_empty() {
        return MultipartData::invalid();
    }

    MultipartData {
        filename,
        content: Bytes::copy_from_slice(content),
        is_valid: true,
    }
}

fn split_headers(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        return Some((&raw[..pos], &raw[pos + 4..]));
    }
    if let Some(pos) = find_subslice(raw, b"\n\n") {
        return Some((&raw[..pos], &raw[pos + 2..]));
    }
    None
}

fn extract_filename(headers: &str) -> Option<String> {
    for line in headers.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }

        for param in value.split(';') {
            let Some((key, val)) = param.trim().split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("filename") {
                let val = val.trim();
                let val = val.strip_prefix('"').unwrap_or(val);
                let val = val.strip_suffix('"').unwrap_or(val);
                if val.is_empty() {
                    return None;
                }
                return Some(val.to_string());
            }
        }
    }
    None
}
