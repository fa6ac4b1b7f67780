mod gateway;
mod output;

pub use gateway::CgiGateway;
pub use output::{CgiOutput, parse_cgi_output};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CgiError {
    #[error("failed to spawn CGI process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("CGI i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CGI process exceeded the execution time limit")]
    Timeout,

    #[error("CGI process exited with a failure status (code {code:?})")]
    Exit { code: Option<i32> },

    #[error("CGI process produced a malformed response header block")]
    MalformedOutput,
}
