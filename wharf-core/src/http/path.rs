/// Lexically normalize a request path: collapse duplicate slashes, drop
/// `.` segments and resolve `..` segments without ever climbing above the
/// root. The result always starts with `/`.
///
/// This runs before location matching so that `/a/../b` and `/b` select the
/// same location, and so that traversal sequences cannot skew prefix
/// matching. Filesystem containment is enforced again when paths are
/// resolved against a location root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    normalized.push('/');
    normalized.push_str(&segments.join("/"));

    // A trailing slash is significant for directory requests.
    if path.ends_with('/') && normalized != "/" {
        normalized.push('/');
    }

    normalized
}
