//! Path and filesystem service used by stream handlers

use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operations a stream handler delegates to
pub trait PathService: Send + Sync {
    /// Normalize a path or URI without touching the filesystem
    fn canonicalize(&self, path: &str) -> String;

    /// Create `dir` and any missing parents
    fn ensure_dir(&self, dir: &Path) -> io::Result<()>;

    /// Directory relative paths are resolved against
    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// [`PathService`] backed by `std`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPathService;

impl PathService for StdPathService {
    fn canonicalize(&self, path: &str) -> String {
        canonicalize(path, std::env::var("HOME").ok().as_deref())
    }

    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

/// Lexically normalize `path`
///
/// Backslashes become slashes, `.` segments and duplicate slashes are
/// dropped and `..` removes the previous segment. A `scheme://` prefix is
/// kept as is and a leading `~` expands to `home` when given. Leading `..`
/// segments of relative paths are kept; those above the root are dropped.
pub fn canonicalize(path: &str, home: Option<&str>) -> String {
    if path.is_empty() {
        return String::new();
    }

    let path = path.replace('\\', "/");
    let (scheme, rest) = match path.find("://") {
        Some(idx) => path.split_at(idx + 3),
        None => ("", path.as_str()),
    };

    let expanded;
    let rest = match (rest.strip_prefix('~'), home) {
        (Some(tail), Some(home)) if tail.is_empty() || tail.starts_with('/') => {
            expanded = format!("{}{tail}", home.trim_end_matches('/'));
            expanded.as_str()
        }
        _ => rest,
    };

    let absolute = rest.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("{scheme}/{joined}")
    } else {
        format!("{scheme}{joined}")
    }
}
