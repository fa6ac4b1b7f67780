//! The per-request decision tree: explicit handler, redirect, method
//! check, CGI, upload, static file, or error. Exactly one outcome per
//! call, and every path terminates in a determinate response.

use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use tracing::{debug, error, warn};

use crate::cgi::{CgiError, CgiGateway};
use crate::config::{Location, ServerConfig};
use crate::http::{Request, Response};
use crate::multipart;
use crate::response::{
    set_error_response, set_method_not_allowed, set_redirect,
    set_success_response_with_default_page,
};
use crate::route::{Handler, find_location};
use crate::static_files::{
    Resolved, ResolveError, ServeError, resolve_under_root, serve_directory_listing, serve_file,
};

/// Executes the decision tree for one request. Stateless; all per-request
/// data is scoped to a single `process` call.
pub struct RequestProcessor;

impl Default for RequestProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestProcessor {
    pub fn new() -> Self {
        Self
    }

    pub async fn process(
        &self,
        req: &Request,
        handler: Option<Arc<dyn Handler>>,
        res: &mut Response,
        server: &ServerConfig,
    ) {
        // An explicitly registered handler takes precedence over any
        // location-based resolution.
        if let Some(handler) = handler {
            if req.body.len() as u64 > server.client_max_body_size {
                set_error_response(res, StatusCode::PAYLOAD_TOO_LARGE, Some(server)).await;
                return;
            }

            if let Err(err) = handler.handle(req, res, server).await {
                error!(path = %req.path, %err, "route handler failed");
                set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server)).await;
            }
            return;
        }

        let Some(location) = find_location(server, &req.path) else {
            debug!(path = %req.path, "no location matched");
            set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await;
            return;
        };

        // Body size is enforced before any multipart or CGI work begins.
        if req.body.len() as u64 > location.max_body_size(server) {
            set_error_response(res, StatusCode::PAYLOAD_TOO_LARGE, Some(server)).await;
            return;
        }

        // Redirect wins over CGI, which wins over static serving.
        if let Some(target) = &location.redirect {
            let status = StatusCode::from_u16(location.redirect_status)
                .unwrap_or(StatusCode::FOUND);
            set_redirect(res, status, target);
            return;
        }

        if !location.allows(&req.method) {
            set_method_not_allowed(res, &location.methods, Some(server)).await;
            return;
        }

        if location.is_cgi_path(&req.path) {
            run_cgi(req, res, server, location).await;
            return;
        }

        if matches!(req.method, Method::POST | Method::PUT) && location.upload_dir.is_some() {
            handle_upload(req, res, server, location).await;
            return;
        }

        serve_static(req, res, server, location).await;
    }
}

/// Static-file fallback: resolve under the location root and serve.
pub(crate) async fn serve_static(
    req: &Request,
    res: &mut Response,
    server: &ServerConfig,
    location: &Location,
) {
    let root = location.effective_root(server);

    match resolve_under_root(root, &location.path, &req.path, location.index.as_deref()) {
        Ok(Resolved::File(path)) => {
            if let Err(err) = serve_file(&path, res).await {
                let status = match err {
                    ServeError::NotFound => StatusCode::NOT_FOUND,
                    ServeError::Forbidden => StatusCode::FORBIDDEN,
                    ServeError::Io => StatusCode::INTERNAL_SERVER_ERROR,
                };
                set_error_response(res, status, Some(server)).await;
            }
        }

        Ok(Resolved::Directory(dir)) => {
            if location.autoindex {
                serve_directory_listing(&dir, &req.path, res);
            } else {
                set_error_response(res, StatusCode::FORBIDDEN, Some(server)).await;
            }
        }

        Err(err) => {
            let status = match err {
                ResolveError::NotFound => StatusCode::NOT_FOUND,
                ResolveError::Forbidden => StatusCode::FORBIDDEN,
                ResolveError::BadPath => StatusCode::BAD_REQUEST,
            };
            set_error_response(res, status, Some(server)).await;
        }
    }
}

/// Execute the location's interpreter against the matched script and relay
/// its output. All gateway failures collapse to 500/502/504 here.
pub(crate) async fn run_cgi(
    req: &Request,
    res: &mut Response,
    server: &ServerConfig,
    location: &Location,
) {
    let Some(interpreter) = &location.cgi_interpreter else {
        set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await;
        return;
    };

    let root = location.effective_root(server);
    let script = match resolve_under_root(root, &location.path, &req.path, None) {
        Ok(Resolved::File(path)) => path,
        Ok(Resolved::Directory(_)) | Err(ResolveError::NotFound) => {
            set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await;
            return;
        }
        Err(ResolveError::Forbidden) => {
            set_error_response(res, StatusCode::FORBIDDEN, Some(server)).await;
            return;
        }
        Err(ResolveError::BadPath) => {
            set_error_response(res, StatusCode::BAD_REQUEST, Some(server)).await;
            return;
        }
    };

    let gateway = CgiGateway::new(Duration::from_secs(server.cgi_timeout_secs));

    match gateway.execute(&script, interpreter, req, server).await {
        Ok(output) => {
            let content_type = output
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "text/plain".to_string());

            res.set(output.status, &content_type, output.body);

            for (key, value) in &output.headers {
                if key.eq_ignore_ascii_case("content-type")
                    || key.eq_ignore_ascii_case("content-length")
                {
                    continue;
                }
                if let Ok(name) = key.parse::<http::header::HeaderName>() {
                    res.insert_header(name, value);
                }
            }
        }

        Err(err) => {
            let status = match err {
                CgiError::Spawn(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CgiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                CgiError::Io(_) | CgiError::Exit { .. } | CgiError::MalformedOutput => {
                    StatusCode::BAD_GATEWAY
                }
            };
            warn!(script = %script.display(), %err, "CGI request failed");
            set_error_response(res, status, Some(server)).await;
        }
    }
}

/// Persist an uploaded body below the location's upload directory.
/// Multipart bodies are split into file parts; anything else is stored
/// raw under the last path segment.
pub(crate) async fn handle_upload(
    req: &Request,
    res: &mut Response,
    server: &ServerConfig,
    location: &Location,
) {
    let upload_dir = match &location.upload_dir {
        Some(dir) => dir.clone(),
        None => location.effective_root(server).join("uploads"),
    };

    if let Err(err) = tokio::fs::create_dir_all(&upload_dir).await {
        error!(dir = %upload_dir.display(), %err, "cannot create upload directory");
        set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server)).await;
        return;
    }

    if let Some(boundary) = req.multipart_boundary() {
        let parts = multipart::parse_parts(&req.body, boundary);
        let valid: Vec<_> = parts.into_iter().filter(|p| p.is_valid).collect();

        if valid.is_empty() {
            set_error_response(res, StatusCode::BAD_REQUEST, Some(server)).await;
            return;
        }

        for part in valid {
            // Strip any directory components a client smuggled into the
            // filename attribute.
            let Some(name) = std::path::Path::new(&part.filename)
                .file_name()
                .map(|n| n.to_owned())
            else {
                set_error_response(res, StatusCode::BAD_REQUEST, Some(server)).await;
                return;
            };

            let dest = upload_dir.join(&name);
            if let Err(err) = tokio::fs::write(&dest, &part.content).await {
                error!(dest = %dest.display(), %err, "failed to persist upload");
                set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server)).await;
                return;
            }
            debug!(dest = %dest.display(), "multipart upload persisted");
        }

        set_success_response_with_default_page(res, StatusCode::CREATED);
        return;
    }

    if req.body.is_empty() {
        set_error_response(res, StatusCode::BAD_REQUEST, Some(server)).await;
        return;
    }

    let filename = req
        .path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("upload.bin");

    let dest = upload_dir.join(filename);
    match tokio::fs::write(&dest, &req.body).await {
        Ok(()) => {
            debug!(dest = %dest.display(), "raw upload persisted");
            set_success_response_with_default_page(res, StatusCode::CREATED);
        }
        Err(err) => {
            error!(dest = %dest.display(), %err, "failed to persist upload");
            set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server)).await;
        }
    }
}
