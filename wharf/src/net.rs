//! Minimal connection harness. One listener per configured server; each
//! connection is read into a `Request`, dispatched through the router, and
//! the fully built `Response` is serialized back. Connections are not kept
//! alive.

use std::sync::Arc;

use anyhow::{Context, bail};
use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use wharf_core::config::{ServerConfig, WharfConfig};
use wharf_core::http::{Request, Response};
use wharf_core::response::set_error_response;
use wharf_core::route::Router;

const MAX_HEADER_BYTES: usize = 16 * 1024;

pub async fn serve(config: WharfConfig, router: Router) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let router = Arc::new(router);

    let mut listeners = Vec::with_capacity(config.servers.len());
    for server in &config.servers {
        let addr = format!("{}:{}", server.host, server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr} for server '{}'", server.name))?;
        info!(%addr, server = %server.name, "listening");
        listeners.push((server.id, listener));
    }

    let mut tasks = Vec::with_capacity(listeners.len());
    for (server_id, listener) in listeners {
        let config = Arc::clone(&config);
        let router = Arc::clone(&router);
        tasks.push(tokio::spawn(accept_loop(listener, server_id, config, router)));
    }

    for task in tasks {
        task.await?;
    }
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    server_id: usize,
    config: Arc<WharfConfig>,
    router: Arc<Router>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let config = Arc::clone(&config);
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let server = &config.servers[server_id];
                    if let Err(err) = handle_connection(stream, &router, server).await {
                        debug!(%peer, %err, "connection error");
                    }
                });
            }
            Err(err) => {
                error!(%err, "accept failed");
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    server: &ServerConfig,
) -> anyhow::Result<()> {
    let mut res = Response::default();

    match read_request(&mut stream, server).await {
        Ok(req) => {
            router.handle_request(server, &req, &mut res).await;
        }
        Err(err) => {
            warn!(%err, "failed to read request");
            set_error_response(&mut res, StatusCode::BAD_REQUEST, Some(server)).await;
        }
    }

    write_response(&mut stream, &res).await
}

/// Read one HTTP/1.1 request: header block up to the blank line, then a
/// Content-Length body. The body is read in full even past the configured
/// limit so the processor can answer 413 instead of the peer seeing a reset.
async fn read_request(stream: &mut TcpStream, server: &ServerConfig) -> anyhow::Result<Request> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            bail!("header block exceeds {MAX_HEADER_BYTES} bytes");
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            bail!("connection closed before the header block completed");
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let header_text = std::str::from_utf8(&buf[..header_end]).context("non-UTF-8 header block")?;
    let mut lines = header_text.split("\r\n");

    let request_line = lines.next().context("empty request")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("missing method")?;
    let method = Method::from_bytes(method.as_bytes()).context("invalid method")?;
    let target = parts.next().context("missing request target")?.to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').context("malformed header line")?;
        let name: HeaderName = name.trim().parse().context("invalid header name")?;
        let value = HeaderValue::from_str(value.trim()).context("invalid header value")?;
        headers.append(name, value);
    }

    let content_length: u64 = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    // Hard ceiling well above any configurable limit.
    let ceiling = server
        .client_max_body_size
        .saturating_mul(4)
        .max(64 * 1024 * 1024);
    if content_length > ceiling {
        bail!("declared body of {content_length} bytes refused");
    }
    let content_length = content_length as usize;

    let mut body = buf.split_off(header_end + 4);
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            bail!("connection closed mid-body");
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Request::new(method, &target, headers, Bytes::from(body)))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn write_response(stream: &mut TcpStream, res: &Response) -> anyhow::Result<()> {
    let reason = res.status.canonical_reason().unwrap_or("Unknown");
    let mut head = format!("HTTP/1.1 {} {reason}\r\n", res.status.as_u16());

    for (name, value) in &res.headers {
        if let Ok(value) = value.to_str() {
            head.push_str(name.as_str());
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
    }
    if !res.headers.contains_key(CONTENT_LENGTH) {
        head.push_str(&format!("content-length: {}\r\n", res.body.len()));
    }
    if !res.headers.contains_key(CONNECTION) {
        head.push_str("connection: close\r\n");
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&res.body).await?;
    stream.shutdown().await?;
    Ok(())
}
