mod error;
mod server;

pub use error::ConfigError;
pub use server::{HandlerKind, Location, RouteConfig, ServerConfig};

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WharfConfig {
    pub servers: Vec<ServerConfig>,
}

impl WharfConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let mut cfg: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::parse(path, e))?;

        cfg.finalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Assign server ids in declaration order and normalize method casing.
    /// Runs before validation; ids are stable for the process lifetime.
    fn finalize(&mut self) {
        for (id, server) in self.servers.iter_mut().enumerate() {
            server.id = id;

            for location in &mut server.locations {
                for method in &mut location.methods {
                    method.make_ascii_uppercase();
                }
            }

            for route in &mut server.routes {
                route.method.make_ascii_uppercase();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for server in &self.servers {
            server.validate()?;
        }
        Ok(())
    }
}

impl FromStr for WharfConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: Self =
            toml::from_str(s).map_err(|e| ConfigError::parse("<inline>", e))?;

        cfg.finalize();
        cfg.validate()?;
        Ok(cfg)
    }
}
