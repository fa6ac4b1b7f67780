use std::collections::HashMap;
use std::path::{Path, PathBuf};

use http::{Method, StatusCode};
use serde::Deserialize;

use crate::config::ConfigError;

/// One virtual server. Built from configuration at startup and read-only
/// afterwards; the dispatch core never mutates it.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Identifier assigned in declaration order when the config is loaded.
    #[serde(skip)]
    pub id: usize,

    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,

    /// Document root used by locations that do not set their own.
    pub root: PathBuf,

    /// Status code (as string key, TOML restriction) -> page on disk.
    #[serde(default)]
    pub error_pages: HashMap<String, PathBuf>,

    /// Upper bound on request body size, overridable per location.
    #[serde(default = "default_max_body_size")]
    pub client_max_body_size: u64,

    /// Wall-clock limit for CGI children, in seconds.
    #[serde(default = "default_cgi_timeout")]
    pub cgi_timeout_secs: u64,

    #[serde(default)]
    pub locations: Vec<Location>,

    /// Explicit (method, exact path) -> handler bindings.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_size() -> u64 {
    1024 * 1024 // 1 MiB
}

fn default_cgi_timeout() -> u64 {
    5
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() && self.routes.is_empty() {
            return Err(ConfigError::EmptyServer {
                server: self.name.clone(),
            });
        }

        for key in self.error_pages.keys() {
            if key.parse::<u16>().is_err() {
                return Err(ConfigError::InvalidErrorPageStatus {
                    server: self.name.clone(),
                    key: key.clone(),
                });
            }
        }

        for location in &self.locations {
            location.validate()?;
        }

        let mut seen: Vec<(&str, &str)> = Vec::new();
        for route in &self.routes {
            route.validate()?;
            if seen.contains(&(route.method.as_str(), route.path.as_str())) {
                return Err(ConfigError::DuplicateRoute {
                    method: route.method.clone(),
                    path: route.path.clone(),
                });
            }
            seen.push((&route.method, &route.path));
        }

        Ok(())
    }

    pub fn error_page(&self, status: StatusCode) -> Option<&PathBuf> {
        self.error_pages.get(&status.as_u16().to_string())
    }
}

/// A routing rule scoped to a path prefix within one server.
///
/// At most one of static serving, CGI, and redirect takes effect for a given
/// request; the request processor picks redirect over CGI over static.
#[derive(Debug, Deserialize)]
pub struct Location {
    /// URL path prefix, e.g. "/", "/static"
    pub path: String,

    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// Filesystem directory served by this location. Falls back to the
    /// server root when unset.
    pub root: Option<PathBuf>,

    /// File served when the resolved path is a directory.
    pub index: Option<String>,

    /// Render a directory listing when no index file applies.
    #[serde(default)]
    pub autoindex: bool,

    /// Extension that selects CGI execution, e.g. ".py". Requires
    /// `cgi_interpreter`.
    pub cgi_extension: Option<String>,

    /// Interpreter executed against the matched script.
    pub cgi_interpreter: Option<PathBuf>,

    /// Directory that uploaded files are persisted into.
    pub upload_dir: Option<PathBuf>,

    /// Redirect target (mutually exclusive with CGI and upload handling).
    pub redirect: Option<String>,

    #[serde(default = "default_redirect_status")]
    pub redirect_status: u16,

    /// Overrides the server-wide body size limit for this prefix.
    pub client_max_body_size: Option<u64>,
}

fn default_methods() -> Vec<String> {
    vec![Method::GET.to_string()]
}

fn default_redirect_status() -> u16 {
    302
}

impl Location {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidLocationPath {
                path: self.path.clone(),
            });
        }

        for method in &self.methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                return Err(ConfigError::InvalidMethod {
                    path: self.path.clone(),
                    method: method.clone(),
                });
            }
        }

        if self.cgi_extension.is_some() != self.cgi_interpreter.is_some() {
            return Err(ConfigError::CgiPairIncomplete {
                path: self.path.clone(),
            });
        }

        if self.redirect.is_some() {
            if !(300..400).contains(&self.redirect_status) {
                return Err(ConfigError::InvalidRedirectStatus {
                    path: self.path.clone(),
                    status: self.redirect_status,
                });
            }
            if self.cgi_extension.is_some() || self.upload_dir.is_some() {
                return Err(ConfigError::RedirectConflict {
                    path: self.path.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn effective_root<'a>(&'a self, server: &'a ServerConfig) -> &'a Path {
        self.root.as_deref().unwrap_or(&server.root)
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method.as_str())
    }

    /// True when this location enables CGI and the request path selects it.
    pub fn is_cgi_path(&self, request_path: &str) -> bool {
        match (&self.cgi_extension, &self.cgi_interpreter) {
            (Some(ext), Some(_)) => request_path.ends_with(ext.as_str()),
            _ => false,
        }
    }

    pub fn max_body_size(&self, server: &ServerConfig) -> u64 {
        self.client_max_body_size
            .unwrap_or(server.client_max_body_size)
    }
}

/// An explicit route binding, distinct from prefix-based location
/// resolution. Registered once into the routing table at startup.
#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    pub method: String,

    /// Exact request path, e.g. "/health".
    pub path: String,

    pub handler: HandlerKind,
}

impl RouteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidRoutePath {
                path: self.path.clone(),
            });
        }

        if Method::from_bytes(self.method.as_bytes()).is_err() {
            return Err(ConfigError::InvalidRouteMethod {
                path: self.path.clone(),
                method: self.method.clone(),
            });
        }

        Ok(())
    }
}

/// Built-in handlers that explicit routes can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Get,
    Upload,
    Delete,
    Cgi,
    Redirect,
}
