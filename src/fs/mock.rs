// src/fs/mock.rs

use super::{normalize_path, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem keyed by normalized relative paths.
///
/// `./dist/a.js` and `dist/a.js` name the same entry; the root is `.`.
/// Clones share the same underlying tree.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir);

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        let mut entries = self.lock();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        let mut entries = self.lock();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::Dir);
    }

    /// Contents of a file as UTF-8, or `None` if it does not exist.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = normalize_path(path.as_ref());
        match self.lock().get(&path) {
            Some(MockEntry::File(bytes)) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a test already panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    let mut dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    while let Some(d) = dir {
        if d == Path::new(".") {
            break;
        }
        entries.entry(d.to_path_buf()).or_insert(MockEntry::Dir);
        dir = d.parent().filter(|p| !p.as_os_str().is_empty());
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        match self.lock().get(&path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        // A single map insert is already all-or-nothing.
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.lock();
        if entries.remove(&path).is_none() {
            return Err(anyhow!("File not found: {:?}", path));
        }
        entries.retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&normalize_path(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalize_path(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalize_path(path)), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(normalize_path(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = normalize_path(path);
        let entries = self.lock();
        match entries.get(&dir) {
            Some(MockEntry::Dir) => {}
            _ => return Err(anyhow!("Not a directory or not found: {:?}", dir)),
        }

        let is_root = dir == Path::new(".");
        Ok(entries
            .keys()
            .filter(|p| p.as_path() != dir.as_path())
            .filter(|p| {
                let parent = p.parent().filter(|pp| !pp.as_os_str().is_empty());
                match parent {
                    Some(pp) => !is_root && pp == dir.as_path(),
                    None => is_root,
                }
            })
            .cloned()
            .collect())
    }
}
