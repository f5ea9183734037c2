//! Resource loading via an ordered search path.
//!
//! Candidates are tried in a fixed order: the path as written
//! (relative to the working directory), then each user-supplied `-R`
//! directory in the order given, and finally the declaring unit's own
//! directory as the last resort. The first successful whole-file read
//! wins; there is no caching, and the loader never changes the process
//! working directory (every candidate is a joined path).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Ordered sequence of directories tried to resolve a resource path.
#[derive(Debug, Clone)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Build the search path for bindings declared in `declaring_dir`.
    pub fn new(resource_dirs: &[PathBuf], declaring_dir: &Path) -> Self {
        let mut dirs = Vec::with_capacity(resource_dirs.len() + 2);
        dirs.push(PathBuf::from("."));
        dirs.extend(resource_dirs.iter().cloned());
        dirs.push(declaring_dir.to_path_buf());
        Self { dirs }
    }

    /// Load the bytes of `path`, trying each directory in order.
    ///
    /// Absolute paths are opened directly. The failure enumerates
    /// every directory attempted.
    pub fn load(&self, path: &str) -> Result<Vec<u8>> {
        let rel = Path::new(path);
        if rel.is_absolute() {
            return match std::fs::read(rel) {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ResourceNotFound {
                    path: path.to_owned(),
                    tried: vec![rel.parent().unwrap_or(Path::new("/")).to_path_buf()],
                }),
                Err(source) => Err(Error::ResourceRead {
                    path: rel.to_path_buf(),
                    source,
                }),
            };
        }

        for dir in &self.dirs {
            let candidate = dir.join(rel);
            match std::fs::read(&candidate) {
                Ok(bytes) => {
                    debug!(path, from = %candidate.display(), len = bytes.len(), "loaded resource");
                    return Ok(bytes);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(Error::ResourceRead {
                        path: candidate,
                        source,
                    })
                }
            }
        }

        Err(Error::ResourceNotFound {
            path: path.to_owned(),
            tried: self.dirs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn search_order_is_user_dirs_then_declaring_dir() {
        let root = tempdir().unwrap();
        let d1 = root.path().join("d1");
        let d2 = root.path().join("d2");
        let decl = root.path().join("decl");
        for d in [&d1, &d2, &decl] {
            fs::create_dir(d).unwrap();
        }

        fs::write(d2.join("res.bin"), b"from-d2").unwrap();
        fs::write(decl.join("res.bin"), b"from-decl").unwrap();

        // Present only in d2: d2's copy wins over the declaring dir.
        let search = SearchPath::new(&[d1.clone(), d2.clone()], &decl);
        assert_eq!(search.load("res.bin").unwrap(), b"from-d2");

        // Earlier directory shadows later ones.
        fs::write(d1.join("res.bin"), b"from-d1").unwrap();
        assert_eq!(search.load("res.bin").unwrap(), b"from-d1");
    }

    #[test]
    fn declaring_dir_is_the_last_resort() {
        let root = tempdir().unwrap();
        let decl = root.path().join("decl");
        fs::create_dir(&decl).unwrap();
        fs::write(decl.join("only-here.bin"), b"xyz").unwrap();

        let search = SearchPath::new(&[], &decl);
        assert_eq!(search.load("only-here.bin").unwrap(), b"xyz");
    }

    #[test]
    fn not_found_lists_every_directory() {
        let root = tempdir().unwrap();
        let d1 = root.path().join("d1");
        let d2 = root.path().join("d2");
        fs::create_dir(&d1).unwrap();
        fs::create_dir(&d2).unwrap();

        let search = SearchPath::new(&[d1.clone(), d2.clone()], root.path());
        let err = search.load("absent.bin").unwrap_err();
        match err {
            Error::ResourceNotFound { path, tried } => {
                assert_eq!(path, "absent.bin");
                // ".", d1, d2, declaring dir
                assert_eq!(tried.len(), 4);
                assert!(tried.contains(&d1));
                assert!(tried.contains(&d2));
            }
            other => panic!("expected ResourceNotFound, got {other}"),
        }
    }

    #[test]
    fn absolute_paths_bypass_the_search_path() {
        let root = tempdir().unwrap();
        let file = root.path().join("abs.bin");
        fs::write(&file, b"abs").unwrap();

        let search = SearchPath::new(&[], root.path());
        let abs = file.to_str().unwrap();
        assert_eq!(search.load(abs).unwrap(), b"abs");
    }
}
