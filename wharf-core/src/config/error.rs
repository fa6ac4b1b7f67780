use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    //-------------------------------------------------------------------------
    // IO / Parsing
    //-------------------------------------------------------------------------
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {path}\n\n{source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    //-------------------------------------------------------------------------
    // Servers
    //-------------------------------------------------------------------------
    #[error("server '{server}' defines no locations and no routes")]
    EmptyServer { server: String },

    #[error("server '{server}' has an invalid error page status '{key}'")]
    InvalidErrorPageStatus { server: String, key: String },

    //-------------------------------------------------------------------------
    // Locations
    //-------------------------------------------------------------------------
    #[error("location path must start with '/': {path}")]
    InvalidLocationPath { path: String },

    #[error("location '{path}' declares an unknown HTTP method '{method}'")]
    InvalidMethod { path: String, method: String },

    #[error("location '{path}' must set cgi_extension and cgi_interpreter together")]
    CgiPairIncomplete { path: String },

    #[error("location '{path}' has a non-3xx redirect status {status}")]
    InvalidRedirectStatus { path: String, status: u16 },

    #[error("location '{path}' combines a redirect with CGI or upload handling")]
    RedirectConflict { path: String },

    //-------------------------------------------------------------------------
    // Explicit routes
    //-------------------------------------------------------------------------
    #[error("route path must start with '/': {path}")]
    InvalidRoutePath { path: String },

    #[error("route '{path}' declares an unknown HTTP method '{method}'")]
    InvalidRouteMethod { path: String, method: String },

    #[error("duplicate route {method} '{path}'")]
    DuplicateRoute { method: String, path: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
