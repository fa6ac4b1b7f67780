//! Built-in handlers that explicit routes bind to by name. They reuse the
//! same location/static/CGI machinery as the fallback decision tree, so an
//! explicit route behaves like its implicit counterpart at a fixed path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;

use crate::config::{HandlerKind, ServerConfig};
use crate::dispatch::{handle_upload, run_cgi, serve_static};
use crate::http::{Request, Response};
use crate::response::{
    set_error_response, set_redirect, set_success_response_with_default_page,
};
use crate::route::{Handler, find_location};
use crate::static_files::{Resolved, ResolveError, resolve_under_root};

/// One shared instance per kind; every route bound to the same kind holds
/// a clone of the same `Arc`.
pub fn builtin_handlers() -> HashMap<HandlerKind, Arc<dyn Handler>> {
    HashMap::from([
        (HandlerKind::Get, Arc::new(GetHandler) as Arc<dyn Handler>),
        (HandlerKind::Upload, Arc::new(UploadHandler) as Arc<dyn Handler>),
        (HandlerKind::Delete, Arc::new(DeleteHandler) as Arc<dyn Handler>),
        (HandlerKind::Cgi, Arc::new(CgiHandler) as Arc<dyn Handler>),
        (HandlerKind::Redirect, Arc::new(RedirectHandler) as Arc<dyn Handler>),
    ])
}

/// Serves the file the route path resolves to.
pub struct GetHandler;

#[async_trait]
impl Handler for GetHandler {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()> {
        match find_location(server, &req.path) {
            Some(location) => serve_static(req, res, server, location).await,
            None => set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await,
        }
        Ok(())
    }
}

/// Persists the request body below the matched location's upload directory.
pub struct UploadHandler;

#[async_trait]
impl Handler for UploadHandler {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()> {
        match find_location(server, &req.path) {
            Some(location) => handle_upload(req, res, server, location).await,
            None => set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await,
        }
        Ok(())
    }
}

/// Removes the file the route path resolves to.
pub struct DeleteHandler;

#[async_trait]
impl Handler for DeleteHandler {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()> {
        let Some(location) = find_location(server, &req.path) else {
            set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await;
            return Ok(());
        };

        let root = location.effective_root(server);
        match resolve_under_root(root, &location.path, &req.path, None) {
            Ok(Resolved::File(path)) => match tokio::fs::remove_file(&path).await {
                Ok(()) => set_success_response_with_default_page(res, StatusCode::OK),
                Err(_) => {
                    set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server))
                        .await
                }
            },
            // Directories are never deleted through this handler.
            Ok(Resolved::Directory(_)) | Err(ResolveError::Forbidden) => {
                set_error_response(res, StatusCode::FORBIDDEN, Some(server)).await
            }
            Err(ResolveError::NotFound) => {
                set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await
            }
            Err(ResolveError::BadPath) => {
                set_error_response(res, StatusCode::BAD_REQUEST, Some(server)).await
            }
        }
        Ok(())
    }
}

/// Runs the matched location's CGI interpreter against the routed script.
pub struct CgiHandler;

#[async_trait]
impl Handler for CgiHandler {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()> {
        match find_location(server, &req.path) {
            Some(location) => run_cgi(req, res, server, location).await,
            None => set_error_response(res, StatusCode::NOT_FOUND, Some(server)).await,
        }
        Ok(())
    }
}

/// Issues the redirect configured on the matched location.
pub struct RedirectHandler;

#[async_trait]
impl Handler for RedirectHandler {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()> {
        let target = find_location(server, &req.path)
            .and_then(|l| l.redirect.as_ref().map(|t| (t, l.redirect_status)));

        match target {
            Some((target, status)) => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND);
                set_redirect(res, status, target);
            }
            // A redirect route without a redirect target is a config fault.
            None => {
                set_error_response(res, StatusCode::INTERNAL_SERVER_ERROR, Some(server)).await
            }
        }
        Ok(())
    }
}
