// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

pub mod glob;
pub mod mock;

/// Abstract filesystem interface.
///
/// Source expansion, the built-in tools and the version synchronizer all go
/// through this trait so they can run against [`mock::MockFileSystem`].
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Write `contents`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Replace `path` so that readers observe either the old or the new
    /// contents, never a partial write.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Remove a file or a whole directory tree.
    fn remove_path(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = non_empty_parent(path) {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let dir = non_empty_parent(path).unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("creating dir {:?}", dir))?;

        // The temp file must live on the same filesystem for the rename to be atomic.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file next to {:?}", path))?;
        tmp.write_all(contents)
            .with_context(|| format!("writing temp file for {:?}", path))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("syncing temp file for {:?}", path))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("renaming temp file onto {:?}", path))?;
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
        } else {
            fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// Drop `.` components so `./dist/a.js` and `dist/a.js` compare equal.
///
/// An empty result is returned as `.`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Forward-slash string form of a relative path, as matched by glob patterns.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
