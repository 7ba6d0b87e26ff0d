//! Filesystem capability used by the writer and the archive builder.
//!
//! All output-side side effects (directory creation, file writes, directory
//! listings, reads for archiving) go through the [`FrameStore`] trait.
//! [`LocalStore`] is the real filesystem; [`MemoryStore`] keeps everything
//! in a map so pipeline and archive logic can be exercised without touching
//! disk.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Output-side filesystem operations.
pub trait FrameStore: Send + Sync {
    /// Create `dir` and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Create or truncate `path` and write `contents` to it. The parent
    /// directory must already exist.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Read the whole file at `path`.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Bare names of the regular files directly inside `dir`, in no
    /// particular order. Subdirectories are not included.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/// [`FrameStore`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl FrameStore for LocalStore {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Follows symlinks: a link to a directory is skipped, a link to a
            // file is listed.
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("Skipping non UTF-8 file name {name:?}"),
            }
        }
        Ok(names)
    }
}

/// In-memory [`FrameStore`].
///
/// Behaves like a real filesystem where it matters to callers: writes into a
/// directory that was never created fail with `NotFound`. A write budget can
/// be set to simulate a full disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    directories: Mutex<BTreeSet<PathBuf>>,
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    write_budget: Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that accepts `writes` file writes and fails every
    /// write after that.
    pub fn with_write_budget(writes: usize) -> Self {
        let store = Self::default();
        *lock(&store.write_budget) = Some(writes);
        store
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        lock(&self.files).keys().cloned().collect()
    }

    /// Contents of the file at `path`, if present.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.files).get(path.as_ref()).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FrameStore for MemoryStore {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut directories = lock(&self.directories);
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            directories.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !lock(&self.directories).contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        let mut budget = lock(&self.write_budget);
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            *remaining -= 1;
        }

        lock(&self.files).insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file {} does not exist", path.display()),
            )
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        lock(&self.directories).contains(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        if !self.is_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory {} does not exist", dir.display()),
            ));
        }

        Ok(lock(&self.files)
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}
