use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::cgi::output::{CgiOutput, parse_cgi_output};
use crate::cgi::CgiError;
use crate::config::ServerConfig;
use crate::http::Request;

/// Executes a location-selected interpreter against a script file,
/// bridging the CGI protocol: request data in via environment and stdin,
/// response out via stdout.
///
/// The child is an owned resource: every exit path (success, timeout, i/o
/// failure) either waits for it or kills and reaps it, and `kill_on_drop`
/// covers cancellation of the surrounding request.
#[derive(Debug)]
pub struct CgiGateway {
    timeout: Duration,
}

impl CgiGateway {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn execute(
        &self,
        script: &Path,
        interpreter: &Path,
        req: &Request,
        server: &ServerConfig,
    ) -> Result<CgiOutput, CgiError> {
        debug!(script = %script.display(), interpreter = %interpreter.display(), "spawning CGI child");

        let mut child = Command::new(interpreter)
            .arg(script)
            .envs(build_env(script, req, server))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(CgiError::Spawn)?;

        let mut stdin = child.stdin.take();
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CgiError::Io(std::io::Error::other("child stdout not captured")))?;

        let body = req.body.clone();

        // Feed stdin and drain stdout concurrently so a child that writes
        // before reading cannot deadlock on full pipe buffers.
        let timed = tokio::time::timeout(self.timeout, async {
            let write = async {
                if let Some(mut stdin) = stdin.take() {
                    if !body.is_empty() {
                        stdin.write_all(&body).await?;
                    }
                    stdin.shutdown().await?;
                }
                Ok::<_, std::io::Error>(())
            };

            let read = async {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).await?;
                Ok::<_, std::io::Error>(buf)
            };

            let (write_res, read_res) = tokio::join!(write, read);
            write_res?;
            let buf = read_res?;

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, buf))
        })
        .await;

        match timed {
            Err(_elapsed) => {
                warn!(script = %script.display(), "CGI child exceeded time limit, killing");
                let _ = child.kill().await;
                Err(CgiError::Timeout)
            }
            Ok(Err(err)) => {
                let _ = child.kill().await;
                Err(CgiError::Io(err))
            }
            Ok(Ok((status, _))) if !status.success() => {
                Err(CgiError::Exit { code: status.code() })
            }
            Ok(Ok((_, buf))) => parse_cgi_output(&buf),
        }
    }
}

/// The CGI/1.1 environment for one request. Variable names are the wire
/// contract with third-party scripts.
fn build_env(script: &Path, req: &Request, server: &ServerConfig) -> HashMap<String, String> {
    let script_path = script.to_string_lossy().to_string();

    let mut env = HashMap::new();
    env.insert("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string());
    env.insert("SERVER_PROTOCOL".to_string(), "HTTP/1.1".to_string());
    env.insert("SERVER_SOFTWARE".to_string(), "wharf".to_string());
    env.insert("SERVER_NAME".to_string(), server.host.clone());
    env.insert("SERVER_PORT".to_string(), server.port.to_string());
    env.insert("REQUEST_METHOD".to_string(), req.method.to_string());
    env.insert("QUERY_STRING".to_string(), req.query.clone());
    env.insert("SCRIPT_FILENAME".to_string(), script_path.clone());
    env.insert("PATH_INFO".to_string(), script_path);
    env.insert("CONTENT_LENGTH".to_string(), req.body.len().to_string());

    if let Some(content_type) = req.content_type() {
        env.insert("CONTENT_TYPE".to_string(), content_type.to_string());
    }

    // Remaining request headers become HTTP_* variables.
    for (name, value) in &req.headers {
        if name == http::header::CONTENT_TYPE || name == http::header::CONTENT_LENGTH {
            continue;
        }
        let Ok(value) = value.to_str() else {
            continue;
        };
        let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
        env.insert(key, value.to_string());
    }

    env
}
