//! CGI gateway tests driving real /bin/sh children through the dispatch
//! path: environment contract, stdin feed, Status header relay, failure
//! mapping, and child reaping on timeout.

use std::path::Path;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use wharf_core::config::WharfConfig;
use wharf_core::http::{Request, Response};
use wharf_core::route::Router;

fn cgi_config(root: &Path, interpreter: &str, extra: &str) -> WharfConfig {
    format!(
        r#"
        [[servers]]
        name = "main"
        port = 8080
        root = "{}"
        {extra}

        [[servers.locations]]
        path = "/cgi"
        methods = ["GET", "POST"]
        cgi_extension = ".cgi"
        cgi_interpreter = "{interpreter}"
        "#,
        root.display()
    )
    .parse()
    .unwrap()
}

async fn dispatch(cfg: &WharfConfig, req: &Request) -> Response {
    let router = Router::new(&cfg.servers);
    let mut res = Response::default();
    router.handle_request(&cfg.servers[0], req, &mut res).await;
    res
}

fn get(path: &str) -> Request {
    Request::new(Method::GET, path, HeaderMap::new(), Bytes::new())
}

#[tokio::test]
async fn relays_the_status_header_from_the_script() {
    // Arrange
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("create.cgi"),
        "printf 'Status: 201 Created\\r\\nContent-Type: text/plain\\r\\n\\r\\ncreated'\n",
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    // Act
    let res = dispatch(&cfg, &get("/cgi/create.cgi")).await;

    // Assert
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body, Bytes::from_static(b"created"));
    assert_eq!(
        res.headers.get(http::header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
}

#[tokio::test]
async fn missing_status_header_defaults_to_200() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("plain.cgi"),
        "printf 'Content-Type: text/plain\\n\\nok'\n",
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    let res = dispatch(&cfg, &get("/cgi/plain.cgi")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Bytes::from_static(b"ok"));
}

#[tokio::test]
async fn passes_the_query_string_through_the_environment() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("env.cgi"),
        "printf 'Content-Type: text/plain\\n\\n%s' \"$QUERY_STRING\"\n",
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    let res = dispatch(&cfg, &get("/cgi/env.cgi?a=1&b=2")).await;

    assert_eq!(res.body, Bytes::from_static(b"a=1&b=2"));
}

#[tokio::test]
async fn feeds_the_request_body_to_stdin() {
    // Arrange: the script echoes stdin back.
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("echo.cgi"),
        "printf 'Content-Type: text/plain\\n\\n'; cat\n",
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    let req = Request::new(
        Method::POST,
        "/cgi/echo.cgi",
        headers,
        Bytes::from_static(b"field=value"),
    );

    // Act
    let res = dispatch(&cfg, &req).await;

    // Assert
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, Bytes::from_static(b"field=value"));
}

#[tokio::test]
async fn nonzero_exit_is_502() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("fail.cgi"), "exit 3\n").unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    let res = dispatch(&cfg, &get("/cgi/fail.cgi")).await;

    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn malformed_output_is_502() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("garbage.cgi"),
        "printf 'no header block here'\n",
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    let res = dispatch(&cfg, &get("/cgi/garbage.cgi")).await;

    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn missing_script_is_404() {
    let dir = tempdir().unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "");

    let res = dispatch(&cfg, &get("/cgi/ghost.cgi")).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unspawnable_interpreter_is_500() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("app.cgi"), "exit 0\n").unwrap();
    let cfg = cgi_config(dir.path(), "/does/not/exist", "");

    let res = dispatch(&cfg, &get("/cgi/app.cgi")).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn timeout_is_504_and_the_child_is_reaped() {
    // Arrange: the script records its own pid, then sleeps far past the
    // one-second limit.
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    std::fs::write(
        dir.path().join("slow.cgi"),
        format!("echo $$ > {}\nexec sleep 30\n", pid_file.display()),
    )
    .unwrap();
    let cfg = cgi_config(dir.path(), "/bin/sh", "cgi_timeout_secs = 1");

    // Act
    let res = dispatch(&cfg, &get("/cgi/slow.cgi")).await;

    // Assert
    assert_eq!(res.status, StatusCode::GATEWAY_TIMEOUT);

    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    // The gateway kills and reaps on the timeout path, so the process must
    // be gone (no orphan, no zombie).
    for _ in 0..50 {
        if !Path::new(&format!("/proc/{pid}")).exists() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("CGI child {pid} still exists after timeout");
}
