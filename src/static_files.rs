use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::response::DEFAULT_CONTENT_TYPE;


const MODULE: &str = "STATIC";

/// Source of static content consulted before any route is matched.
pub trait ContentProvider: Send + Sync {
    /// Bytes and content type for `uri`, or `None` if nothing is there.
    fn lookup(&self, uri: &str) -> Option<(Vec<u8>, &'static str)>;
}

/// Serves files from a directory on disk.
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn map_path(&self, uri: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for comp in Path::new(uri.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => path.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|s| s.to_str()).unwrap_or("").to_lowercase().as_str() {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            _ => DEFAULT_CONTENT_TYPE,
        }
    }
}

impl ContentProvider for StaticFiles {
    fn lookup(&self, uri: &str) -> Option<(Vec<u8>, &'static str)> {
        let path = self.map_path(uri)?;
        if !path.is_file() {
            return None;
        }
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("[{}] Serving {} ({} bytes)", MODULE, path.display(), bytes.len());
                Some((bytes, Self::content_type(&path)))
            }
            Err(e) => {
                warn!("[{}] Failed to read {}: {}", MODULE, path.display(), e);
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn root_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn finds_existing_file() {
        let dir = root_with(&[("hello.txt", "Hello\n")]);
        let sf = StaticFiles::new(dir.path());
        let (bytes, ct) = sf.lookup("/hello.txt").unwrap();
        assert_eq!(bytes, b"Hello\n".to_vec());
        assert_eq!(ct, "text/plain");
    }

    #[test]
    fn nested_file_and_default_type() {
        let dir = root_with(&[("assets/blob", "raw")]);
        let sf = StaticFiles::new(dir.path());
        let (bytes, ct) = sf.lookup("/assets/blob").unwrap();
        assert_eq!(bytes, b"raw".to_vec());
        assert_eq!(ct, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn missing_file_and_directory_are_not_found() {
        let dir = root_with(&[("assets/app.js", "x")]);
        let sf = StaticFiles::new(dir.path());
        assert!(sf.lookup("/nope").is_none());
        assert!(sf.lookup("/assets").is_none());
        assert!(sf.lookup("/").is_none());
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = root_with(&[("inner/secret.txt", "s")]);
        let sf = StaticFiles::new(dir.path().join("inner"));
        assert!(sf.map_path("../secret.txt").is_none());
        assert!(sf.map_path("/a/../../secret.txt").is_none());
        assert!(sf.lookup("/secret.txt").is_some());
    }
}
