//! File access seam for manifest I/O.
//!
//! Manifest parsing never touches `std::fs` directly; it goes through a
//! [`FileSystem`] so callers can supply the real disk ([`OsFileSystem`]) or an
//! in-memory store ([`MemoryFileSystem`]).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub trait FileSystem: Send + Sync {
    /// Read the entire contents addressed by `path`.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// [`FileSystem`] backed by the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Atomically replace `path` with `contents`.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        // Fsync parent directory so the rename survives power loss.
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        Ok(())
    }
}

/// In-memory [`FileSystem`], keyed by exact path.
///
/// Reads can be forced to fail with [`MemoryFileSystem::fail_reads_with`].
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    read_error: Mutex<Option<String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_string(&self, path: impl AsRef<Path>, contents: &str) -> io::Result<()> {
        self.write_file(path.as_ref(), contents.as_bytes())
    }

    /// Make every subsequent read fail with `message`.
    pub fn fail_reads_with(&self, message: impl Into<String>) -> io::Result<()> {
        *lock(&self.read_error)? = Some(message.into());
        Ok(())
    }

    pub fn clear_read_error(&self) -> io::Result<()> {
        *lock(&self.read_error)? = None;
        Ok(())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> io::Result<bool> {
        Ok(lock(&self.files)?.contains_key(path.as_ref()))
    }
}

fn lock<T>(m: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|e| io::Error::other(format!("mutex poisoned: {e}")))
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        if let Some(message) = lock(&self.read_error)?.as_ref() {
            return Err(io::Error::other(message.clone()));
        }
        lock(&self.files)?.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        lock(&self.files)?.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_returns_written_bytes() {
        let fs = MemoryFileSystem::new();
        fs.write_string("/pkg/spec", "name: a\n").unwrap();
        assert!(fs.contains("/pkg/spec").unwrap());
        assert!(!fs.contains("/pkg/other").unwrap());
        assert_eq!(fs.read_file(Path::new("/pkg/spec")).unwrap(), b"name: a\n");
    }

    #[test]
    fn memory_read_missing_path_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs.read_file(Path::new("/missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn memory_injected_read_error_wins_until_cleared() {
        let fs = MemoryFileSystem::new();
        fs.write_string("/path", "-").unwrap();
        fs.fail_reads_with("fake-err").unwrap();

        let err = fs.read_file(Path::new("/path")).unwrap_err();
        assert_eq!(err.to_string(), "fake-err");

        fs.clear_read_error().unwrap();
        assert_eq!(fs.read_file(Path::new("/path")).unwrap(), b"-");
    }

    #[test]
    fn poisoned_store_is_reported_as_error() {
        let fs = std::sync::Arc::new(MemoryFileSystem::new());
        let poisoner = std::sync::Arc::clone(&fs);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.files.lock().unwrap();
            panic!("poison the file map");
        })
        .join();

        let err = fs.contains("/pkg/spec").unwrap_err();
        assert!(err.to_string().contains("mutex poisoned"), "got: {err}");
        assert!(fs.read_file(Path::new("/pkg/spec")).is_err());
    }

    #[test]
    fn os_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.MF");
        let fs = OsFileSystem::new();

        fs.write_file(&path, b"first").unwrap();
        fs.write_file(&path, b"second").unwrap();

        assert_eq!(fs.read_file(&path).unwrap(), b"second");
        // No temp files left behind next to the target.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn os_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = OsFileSystem::new()
            .read_file(&dir.path().join("absent"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
