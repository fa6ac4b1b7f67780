pub mod cgi;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod http;
pub mod logging;
pub mod multipart;
pub mod response;
pub mod route;
pub mod static_files;
