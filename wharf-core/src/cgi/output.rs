use bytes::Bytes;
use http::StatusCode;

use crate::cgi::CgiError;

/// A parsed CGI response: the document the child produced on stdout.
#[derive(Debug)]
pub struct CgiOutput {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Parse captured child stdout as the CGI response format: a `key: value`
/// header block terminated by a blank line, then the body. A `Status`
/// header sets the response status; absent means 200. Anything that does
/// not follow the format is malformed (the caller maps that to 502).
pub fn parse_cgi_output(raw: &[u8]) -> Result<CgiOutput, CgiError> {
    let (header_block, body) = split_output(raw).ok_or(CgiError::MalformedOutput)?;

    let header_text =
        std::str::from_utf8(header_block).map_err(|_| CgiError::MalformedOutput)?;

    let mut status = StatusCode::OK;
    let mut headers = Vec::new();

    for line in header_text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(CgiError::MalformedOutput)?;
        let key = key.trim();
        let value = value.trim();

        if key.eq_ignore_ascii_case("status") {
            status = parse_status_value(value).ok_or(CgiError::MalformedOutput)?;
        } else {
            headers.push((key.to_string(), value.to_string()));
        }
    }

    Ok(CgiOutput {
        status,
        headers,
        body: Bytes::copy_from_slice(body),
    })
}

/// Split at the first blank line; scripts emit either CRLF or bare LF.
fn split_output(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        return Some((&raw[..pos], &raw[pos + 4..]));
    }
    if let Some(pos) = find_subslice(raw, b"\n\n") {
        return Some((&raw[..pos], &raw[pos + 2..]));
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// "201 Created" or just "201".
fn parse_status_value(value: &str) -> Option<StatusCode> {
    let code = value.split_whitespace().next()?;
    StatusCode::from_u16(code.parse().ok()?).ok()
}
