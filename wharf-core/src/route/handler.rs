use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::http::{Request, Response};

/// A handler registered on an explicit route. Stored behind `Arc` in the
/// routing table, so several routes may share one instance.
///
/// Handlers fill the response themselves; a returned error is converted to
/// a 500 by the request processor and never reaches the connection layer.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        req: &Request,
        res: &mut Response,
        server: &ServerConfig,
    ) -> anyhow::Result<()>;
}
