use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ServerConfig;
use crate::dispatch::RequestProcessor;
use crate::handlers::builtin_handlers;
use crate::http::{Request, Response};
use crate::route::Handler;

/// server id -> HTTP method -> exact path -> handler. Built once at
/// startup, read-only afterwards; concurrent dispatches share it freely.
type RoutingTable = HashMap<usize, HashMap<String, HashMap<String, Arc<dyn Handler>>>>;

/// Owns the routing table and the per-request entry point.
pub struct Router {
    routes: RoutingTable,
    processor: RequestProcessor,
}

impl Router {
    /// Build the routing table from configuration. Call exactly once after
    /// the configuration has been loaded.
    pub fn new(configs: &[ServerConfig]) -> Self {
        let mut router = Self {
            routes: HashMap::new(),
            processor: RequestProcessor::new(),
        };

        let builtins = builtin_handlers();

        for server in configs {
            for route in &server.routes {
                let handler = Arc::clone(&builtins[&route.handler]);
                router.add_route(server.id, &route.method, &route.path, handler);
            }
        }

        router
    }

    pub fn add_route(
        &mut self,
        server_id: usize,
        method: &str,
        path: &str,
        handler: Arc<dyn Handler>,
    ) {
        debug!(server_id, method, path, "registering route");
        self.routes
            .entry(server_id)
            .or_default()
            .entry(method.to_string())
            .or_default()
            .insert(path.to_string(), handler);
    }

    /// Dispatch one request. An exact-route miss is not an error: the
    /// request processor still attempts location-based resolution, and
    /// every path through it terminates in a determinate response.
    pub async fn handle_request(&self, server: &ServerConfig, req: &Request, res: &mut Response) {
        let handler = self.find_handler(server.id, req.method.as_str(), &req.path);
        self.processor.process(req, handler, res, server).await;
    }

    fn find_handler(
        &self,
        server_id: usize,
        method: &str,
        path: &str,
    ) -> Option<Arc<dyn Handler>> {
        self.routes
            .get(&server_id)?
            .get(method)?
            .get(path)
            .cloned()
    }

    /// Registered routes as (server id, method, path), sorted for stable
    /// diagnostic output.
    pub fn routes(&self) -> Vec<(usize, &str, &str)> {
        let mut out = Vec::new();
        for (&server_id, by_method) in &self.routes {
            for (method, by_path) in by_method {
                for path in by_path.keys() {
                    out.push((server_id, method.as_str(), path.as_str()));
                }
            }
        }
        out.sort();
        out
    }
}
