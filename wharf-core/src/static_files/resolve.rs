use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no file or directory under the location root")]
    NotFound,
    #[error("path escapes the location root or is not accessible")]
    Forbidden,
    #[error("malformed request path")]
    BadPath,
}

#[derive(Debug)]
pub enum Resolved {
    File(PathBuf),
    Directory(PathBuf),
}

/// Turn a request path into a filesystem path under `root`, given the
/// location prefix that matched. Resolved paths never leave `root`: parent
/// and absolute components are rejected outright, and the canonicalized
/// target is checked for containment against the canonicalized root.
///
/// When the target is a directory and `index` names a file that exists in
/// it, the index file is resolved instead.
pub fn resolve_under_root(
    root: &Path,
    prefix: &str,
    request_path: &str,
    index: Option<&str>,
) -> Result<Resolved, ResolveError> {
    if !request_path.starts_with('/') || !prefix.starts_with('/') {
        return Err(ResolveError::BadPath);
    }

    // The part of the request path below the location prefix.
    let rel = request_path
        .strip_prefix(prefix)
        .or_else(|| {
            // "/" matches every path with nothing stripped.
            if prefix == "/" {
                Some(request_path)
            } else {
                None
            }
        })
        .ok_or(ResolveError::NotFound)?;

    // Percent-decode once.
    let decoded = percent_encoding::percent_decode_str(rel)
        .decode_utf8()
        .map_err(|_| ResolveError::BadPath)?;

    let decoded = decoded.trim_start_matches('/');
    let relative_path = PathBuf::from(decoded);

    // No traversal, no absolute components.
    for component in relative_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(ResolveError::Forbidden),
        }
    }

    let full_path = root.join(&relative_path);

    let root_canon = root.canonicalize().map_err(|_| ResolveError::Forbidden)?;

    let target_canon = match full_path.canonicalize() {
        Ok(p) => p,
        Err(_) => return Err(ResolveError::NotFound),
    };

    // Containment check catches symlinks pointing outside the root.
    if !target_canon.starts_with(&root_canon) {
        return Err(ResolveError::Forbidden);
    }

    if target_canon.is_dir() {
        if let Some(index) = index {
            let index_path = target_canon.join(index);
            if index_path.is_file() {
                return Ok(Resolved::File(index_path));
            }
        }
        return Ok(Resolved::Directory(target_canon));
    }

    if !target_canon.is_file() {
        return Err(ResolveError::NotFound);
    }

    Ok(Resolved::File(target_canon))
}
