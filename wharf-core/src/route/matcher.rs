use crate::config::{Location, ServerConfig};

/// Longest-prefix match over a server's configured locations.
///
/// Prefixes align on path-segment boundaries: "/images" matches "/images"
/// and "/images/x" but never "/imageshack/x". "/" matches every path.
/// Equal-length prefixes resolve to the earlier declaration, so matching is
/// deterministic for a given config.
pub fn find_location<'a>(server: &'a ServerConfig, path: &str) -> Option<&'a Location> {
    let mut best: Option<&Location> = None;

    for location in &server.locations {
        if !prefix_matches(&location.path, path) {
            continue;
        }

        match best {
            // Only a strictly longer prefix displaces the current best;
            // ties keep declaration order.
            Some(current) if location.path.len() <= current.path.len() => {}
            _ => best = Some(location),
        }
    }

    best
}

fn prefix_matches(prefix: &str, request_path: &str) -> bool {
    if prefix == "/" {
        return true;
    }

    let prefix = prefix.trim_end_matches('/');

    if request_path == prefix {
        return true;
    }

    request_path.starts_with(prefix)
        && request_path
            .as_bytes()
            .get(prefix.len())
            .map(|b| *b == b'/')
            .unwrap_or(false)
}
