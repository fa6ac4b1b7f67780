mod path;
mod request;
mod response;

pub use path::normalize_path;
pub use request::Request;
pub use response::Response;
