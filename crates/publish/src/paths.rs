//! Mapping object URLs to paths below the publication directory.

use http::Uri;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// Where an object lands: `<host>/<relative>` inside the publication directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectPath {
    pub host: String,
    pub relative: PathBuf,
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// Returns `None` when the path climbs above its starting point.
pub fn normalize(relative: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

/// Compute the on-disk location of the object at `url`.
///
/// Returns `None` for URLs that have no usable host or file name, or whose
/// path would escape the host directory.
pub fn object_path(url: &str) -> Option<ObjectPath> {
    let uri: Uri = url.parse().ok()?;
    uri.scheme()?;
    let host = uri.host()?;
    if host.is_empty() || host == "." || host == ".." {
        return None;
    }
    // Dot segments are only resolved after decoding, so `%2e%2e` counts as `..`.
    let decoded = percent_decode_str(uri.path()).decode_utf8().ok()?;
    let path = decoded.strip_prefix('/').unwrap_or(&decoded);
    if path.is_empty() || path.ends_with('/') || path.contains('\0') {
        return None;
    }
    let relative = normalize(Path::new(path))?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(ObjectPath {
        host: host.to_string(),
        relative,
    })
}
