//! End-to-end dispatch tests: router lookup plus the request processor's
//! decision tree against a real filesystem root.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use wharf_core::config::{ServerConfig, WharfConfig};
use wharf_core::http::{Request, Response};
use wharf_core::route::{Handler, Router};

fn load_config(root: &Path, locations: &str) -> WharfConfig {
    format!(
        r#"
        [[servers]]
        name = "main"
        port = 8080
        root = "{}"

        {locations}
        "#,
        root.display()
    )
    .parse()
    .unwrap()
}

fn get(path: &str) -> Request {
    Request::new(Method::GET, path, HeaderMap::new(), Bytes::new())
}

async fn dispatch(router: &Router, server: &ServerConfig, req: &Request) -> Response {
    let mut res = Response::default();
    router.handle_request(server, req, &mut res).await;
    res
}

#[tokio::test]
async fn serves_a_static_file() {
    // Arrange
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("hello.html"), "<p>hello</p>").unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let router = Router::new(&cfg.servers);

    // Act
    let res = dispatch(&router, &cfg.servers[0], &get("/hello.html")).await;

    // Assert
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Bytes::from_static(b"<p>hello</p>"));
    assert_eq!(
        res.headers.get(http::header::CONTENT_TYPE).unwrap(),
        "text/html"
    );
}

#[tokio::test]
async fn path_matching_no_location_is_404() {
    let dir = tempdir().unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/static\"");
    let router = Router::new(&cfg.servers);

    let res = dispatch(&router, &cfg.servers[0], &get("/other/place")).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disallowed_method_is_405_with_allow_header() {
    let dir = tempdir().unwrap();
    let cfg = load_config(
        dir.path(),
        "[[servers.locations]]\npath = \"/\"\nmethods = [\"GET\", \"HEAD\"]",
    );
    let router = Router::new(&cfg.servers);
    let req = Request::new(Method::DELETE, "/x", HeaderMap::new(), Bytes::new());

    let res = dispatch(&router, &cfg.servers[0], &req).await;

    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers.get(http::header::ALLOW).unwrap(), "GET, HEAD");
}

#[tokio::test]
async fn longest_prefix_location_wins() {
    // Arrange: "/" and "/static" point at different roots holding the same
    // filename with different content.
    let root_a = tempdir().unwrap();
    let root_b = tempdir().unwrap();
    std::fs::write(root_a.path().join("x.txt"), "from root").unwrap();
    std::fs::write(root_b.path().join("x.txt"), "from static").unwrap();

    let cfg = load_config(
        root_a.path(),
        &format!(
            "[[servers.locations]]\npath = \"/\"\n\n\
             [[servers.locations]]\npath = \"/static\"\nroot = \"{}\"",
            root_b.path().display()
        ),
    );
    let router = Router::new(&cfg.servers);

    // Act
    let res = dispatch(&router, &cfg.servers[0], &get("/static/x.txt")).await;

    // Assert
    assert_eq!(res.body, Bytes::from_static(b"from static"));
}

#[tokio::test]
async fn traversal_never_escapes_the_location_root() {
    // Arrange
    let dir = tempdir().unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let router = Router::new(&cfg.servers);

    // Bypass Request::new to keep the raw traversal sequence in the path.
    let mut req = get("/");
    req.path = "/../../etc/passwd".to_string();

    // Act
    let res = dispatch(&router, &cfg.servers[0], &req).await;

    // Assert
    assert_ne!(res.status, StatusCode::OK);
    assert!(!String::from_utf8_lossy(&res.body).contains("root:"));
}

#[tokio::test]
async fn directory_without_index_or_autoindex_is_403() {
    let dir = tempdir().unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let router = Router::new(&cfg.servers);

    let res = dispatch(&router, &cfg.servers[0], &get("/")).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn directory_with_autoindex_renders_a_listing() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("report.pdf"), "").unwrap();
    let cfg = load_config(
        dir.path(),
        "[[servers.locations]]\npath = \"/\"\nautoindex = true",
    );
    let router = Router::new(&cfg.servers);

    let res = dispatch(&router, &cfg.servers[0], &get("/")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&res.body).contains("report.pdf"));
}

#[tokio::test]
async fn directory_with_index_serves_the_index_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("home.html"), "welcome").unwrap();
    let cfg = load_config(
        dir.path(),
        "[[servers.locations]]\npath = \"/\"\nindex = \"home.html\"",
    );
    let router = Router::new(&cfg.servers);

    let res = dispatch(&router, &cfg.servers[0], &get("/")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Bytes::from_static(b"welcome"));
}

#[tokio::test]
async fn redirect_location_sets_location_header() {
    let dir = tempdir().unwrap();
    let cfg = load_config(
        dir.path(),
        "[[servers.locations]]\npath = \"/old\"\nredirect = \"/new\"\nredirect_status = 301",
    );
    let router = Router::new(&cfg.servers);

    let res = dispatch(&router, &cfg.servers[0], &get("/old/page")).await;

    assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers.get(http::header::LOCATION).unwrap(), "/new");
}

struct Teapot;

#[async_trait]
impl Handler for Teapot {
    async fn handle(
        &self,
        _req: &Request,
        res: &mut Response,
        _server: &ServerConfig,
    ) -> anyhow::Result<()> {
        res.set(
            StatusCode::IM_A_TEAPOT,
            "text/plain",
            Bytes::from_static(b"teapot"),
        );
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl Handler for Failing {
    async fn handle(
        &self,
        _req: &Request,
        _res: &mut Response,
        _server: &ServerConfig,
    ) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }
}

#[tokio::test]
async fn explicit_route_takes_precedence_over_static_fallback() {
    // Arrange: the file exists on disk, but an explicit route shadows it.
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("hello.html"), "file content").unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let mut router = Router::new(&cfg.servers);
    router.add_route(0, "GET", "/hello.html", Arc::new(Teapot));

    // Act
    let res = dispatch(&router, &cfg.servers[0], &get("/hello.html")).await;

    // Assert
    assert_eq!(res.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(res.body, Bytes::from_static(b"teapot"));
}

#[tokio::test]
async fn handler_failure_becomes_500() {
    let dir = tempdir().unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let mut router = Router::new(&cfg.servers);
    router.add_route(0, "GET", "/fragile", Arc::new(Failing));

    let res = dispatch(&router, &cfg.servers[0], &get("/fragile")).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn oversized_body_is_413_before_any_handling() {
    let dir = tempdir().unwrap();
    let cfg = load_config(
        dir.path(),
        "[[servers.locations]]\npath = \"/\"\nmethods = [\"POST\"]\nclient_max_body_size = 4",
    );
    let router = Router::new(&cfg.servers);
    let req = Request::new(
        Method::POST,
        "/anything",
        HeaderMap::new(),
        Bytes::from_static(b"way too large"),
    );

    let res = dispatch(&router, &cfg.servers[0], &req).await;

    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn identical_requests_get_identical_responses() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "stable").unwrap();
    let cfg = load_config(dir.path(), "[[servers.locations]]\npath = \"/\"");
    let router = Router::new(&cfg.servers);

    let first = dispatch(&router, &cfg.servers[0], &get("/a.txt")).await;
    let second = dispatch(&router, &cfg.servers[0], &get("/a.txt")).await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
}
