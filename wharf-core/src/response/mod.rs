//! Response construction helpers: default error/success pages, configured
//! custom error pages, and redirect/405 plumbing. Error bodies never carry
//! internal diagnostics.

use bytes::Bytes;
use http::StatusCode;
use tracing::warn;

use crate::config::ServerConfig;
use crate::http::Response;

const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Fill an error response. A custom error page configured for the status is
/// preferred; the rendered default page is the fallback.
pub async fn set_error_response(
    res: &mut Response,
    status: StatusCode,
    server: Option<&ServerConfig>,
) {
    if let Some(server) = server {
        if let Some(page) = server.error_page(status) {
            match tokio::fs::read(page).await {
                Ok(content) => {
                    res.set(status, HTML_UTF8, Bytes::from(content));
                    return;
                }
                Err(err) => {
                    warn!(page = %page.display(), %err, "custom error page not readable");
                }
            }
        }
    }

    res.set(status, HTML_UTF8, render_default_page(status).into());
}

pub fn set_success_response(res: &mut Response, content: Bytes, content_type: &str) {
    res.set(StatusCode::OK, content_type, content);
}

pub fn set_success_response_with_default_page(res: &mut Response, status: StatusCode) {
    res.set(status, HTML_UTF8, render_default_page(status).into());
}

/// 405 with an Allow header listing the location's configured method set.
pub async fn set_method_not_allowed(
    res: &mut Response,
    allowed: &[String],
    server: Option<&ServerConfig>,
) {
    set_error_response(res, StatusCode::METHOD_NOT_ALLOWED, server).await;
    res.insert_header(http::header::ALLOW, &allowed.join(", "));
}

pub fn set_redirect(res: &mut Response, status: StatusCode, target: &str) {
    res.set(status, HTML_UTF8, render_default_page(status).into());
    res.insert_header(http::header::LOCATION, target);
}

fn render_default_page(status: StatusCode) -> String {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Unknown");

    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n\
         <body>\n<h1>{code} {reason}</h1>\n<hr>\n<p>wharf</p>\n</body>\n</html>\n"
    )
}
