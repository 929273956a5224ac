//! Scratch directories with guaranteed cleanup.
//!
//! Every workflow that touches the filesystem does so inside a
//! [`ScopedDir`]. The directory and everything in it is removed when
//! the value drops, so cleanup happens on success, on handled errors,
//! and during panic unwinding alike. Workflows that accumulate several
//! files (merge inputs, collected images) keep them in one `ScopedDir`
//! and release them together at teardown.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// A scratch directory scoped to one operation or session.
#[derive(Debug)]
pub struct ScopedDir {
    dir: TempDir,
}

impl ScopedDir {
    /// Create a fresh scratch directory under `root`, creating `root`
    /// itself if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_under(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("paperbot-").tempdir_in(root)?;
        Ok(Self { dir })
    }

    /// Path of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a named file inside the directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Path for a uniquely named file with the given extension.
    #[must_use]
    pub fn unique_file(&self, ext: &str) -> PathBuf {
        self.dir.path().join(format!("{}.{ext}", Uuid::new_v4()))
    }

    /// Write `bytes` to a named file and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove the directory eagerly, reporting any IO error instead of
    /// swallowing it as `Drop` would.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_removes_directory_and_contents() {
        let root = tempfile::tempdir().expect("root");
        let kept;
        {
            let scoped = ScopedDir::create_under(root.path()).expect("scoped");
            let file = scoped.write_file("a.txt", b"hello").expect("write");
            assert!(file.exists());
            kept = scoped.path().to_path_buf();
        }
        assert!(!kept.exists(), "scratch dir must vanish on drop");
    }

    #[test]
    fn unique_files_do_not_collide() {
        let root = tempfile::tempdir().expect("root");
        let scoped = ScopedDir::create_under(root.path()).expect("scoped");
        let a = scoped.unique_file("pdf");
        let b = scoped.unique_file("pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn close_reports_success() {
        let root = tempfile::tempdir().expect("root");
        let scoped = ScopedDir::create_under(root.path()).expect("scoped");
        let path = scoped.path().to_path_buf();
        scoped.close().expect("close");
        assert!(!path.exists());
    }
}
