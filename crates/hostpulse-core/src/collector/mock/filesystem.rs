//! In-memory mock filesystem for testing collectors without real `/proc`.

use crate::collector::traits::{DiskSpace, FileSystem};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem for testing.
///
/// Stores files, directories and mount usage in memory. A file may also be
/// given a sequence of contents: each read returns the next one and the last
/// one sticks, which lets tests simulate counters advancing between reads.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Pending contents for files that change between reads.
    sequences: Arc<Mutex<HashMap<PathBuf, VecDeque<String>>>>,
    /// Directories implied by added files.
    directories: HashSet<PathBuf>,
    /// statvfs results per mount point.
    mounts: HashMap<PathBuf, DiskSpace>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds a file whose content changes on every read.
    ///
    /// The first read returns `contents[0]`, the next `contents[1]`, and so
    /// on; once exhausted, the last entry is returned forever.
    pub fn add_file_sequence<S: Into<String>>(
        &mut self,
        path: impl AsRef<Path>,
        contents: impl IntoIterator<Item = S>,
    ) {
        let path = path.as_ref().to_path_buf();
        let mut queue: VecDeque<String> = contents.into_iter().map(Into::into).collect();
        let Some(last) = queue.pop_back() else {
            return;
        };
        self.add_file(&path, last);
        if let Ok(mut seq) = self.sequences.lock() {
            seq.insert(path, queue);
        }
    }

    /// Removes a file, making subsequent reads fail with `NotFound`.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.remove(path);
        if let Ok(mut seq) = self.sequences.lock() {
            seq.remove(path);
        }
    }

    /// Sets the statvfs result for a mount point.
    pub fn set_disk_space(&mut self, mount: impl AsRef<Path>, space: DiskSpace) {
        self.mounts.insert(mount.as_ref().to_path_buf(), space);
    }

    /// Removes a mount point, making statvfs on it fail.
    pub fn remove_disk_space(&mut self, mount: impl AsRef<Path>) {
        self.mounts.remove(mount.as_ref());
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if let Ok(mut seq) = self.sequences.lock()
            && let Some(next) = seq.get_mut(path).and_then(VecDeque::pop_front)
        {
            return Ok(next);
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn statvfs(&self, path: &Path) -> io::Result<DiskSpace> {
        self.mounts.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {:?}", path),
            )
        })
    }
}
