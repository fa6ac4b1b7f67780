mod handler;
mod matcher;
mod router;

pub use handler::Handler;
pub use matcher::find_location;
pub use router::Router;
