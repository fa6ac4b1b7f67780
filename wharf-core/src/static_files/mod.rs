mod directory_listing;
mod resolve;
mod serve;

pub use directory_listing::serve_directory_listing;
pub use resolve::{Resolved, ResolveError, resolve_under_root};
pub use serve::{ServeError, serve_file};
