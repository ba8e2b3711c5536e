use std::collections::{BTreeSet, HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{StorageBackend, StorageSnapshot};

/// In-memory storage that can be used as a backend.
///
/// Internally reference counted to enable giving a copy to
/// [`Storage`](struct.Storage.html) and keeping the original to inspect or
/// seed the tree with.
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<InMemoryInner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryInner::default())),
        }
    }

    /// Load a [`StorageSnapshot`](enum.StorageSnapshot.html) into a subtree,
    /// creating any missing ancestors.
    ///
    /// This function will return an error if the operations required to apply
    /// the snapshot result in errors, like trying to create a file inside a
    /// file.
    pub fn load_snapshot<P: Into<PathBuf>>(
        &mut self,
        path: P,
        snapshot: StorageSnapshot,
    ) -> io::Result<()> {
        let mut inner = self.lock();
        inner.load_snapshot(path.into(), snapshot)
    }

    /// Captures the subtree at `path`, or `None` if nothing is there.
    pub fn snapshot<P: AsRef<Path>>(&self, path: P) -> Option<StorageSnapshot> {
        self.lock().capture(path.as_ref())
    }

    /// Removes a file or directory and all of its descendants.
    pub fn remove<P: Into<PathBuf>>(&mut self, path: P) {
        self.lock().remove(path.into());
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct InMemoryInner {
    entries: HashMap<PathBuf, Entry>,
}

impl InMemoryInner {
    fn ensure_dir(&mut self, path: &Path) -> io::Result<()> {
        match self.entries.get(path) {
            Some(Entry::Dir { .. }) => return Ok(()),
            Some(Entry::File { .. }) => return must_be_dir(path),
            None => {}
        }

        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
            self.link_child(parent, path);
        }

        self.entries.insert(
            path.to_path_buf(),
            Entry::Dir {
                children: BTreeSet::new(),
            },
        );

        Ok(())
    }

    fn link_child(&mut self, parent: &Path, child: &Path) {
        if let Some(Entry::Dir { children }) = self.entries.get_mut(parent) {
            children.insert(child.to_path_buf());
        }
    }

    fn load_snapshot(&mut self, path: PathBuf, snapshot: StorageSnapshot) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
            self.link_child(parent, &path);
        }

        match snapshot {
            StorageSnapshot::File { contents } => {
                if let Some(Entry::Dir { .. }) = self.entries.get(&path) {
                    return must_be_file(&path);
                }

                self.entries.insert(path, Entry::File { contents });
            }
            StorageSnapshot::Dir { children } => {
                self.ensure_dir(&path)?;

                for (child_name, child) in children {
                    let full_path = path.join(child_name);
                    self.load_snapshot(full_path, child)?;
                }
            }
        }

        Ok(())
    }

    fn capture(&self, path: &Path) -> Option<StorageSnapshot> {
        match self.entries.get(path)? {
            Entry::File { contents } => Some(StorageSnapshot::file(contents.clone())),
            Entry::Dir { children } => {
                let children = children.iter().filter_map(|child| {
                    let name = child.file_name()?.to_string_lossy().into_owned();
                    Some((name, self.capture(child)?))
                });

                Some(StorageSnapshot::dir(children))
            }
        }
    }

    fn remove(&mut self, root_path: PathBuf) {
        if let Some(parent) = root_path.parent() {
            if let Some(Entry::Dir { children }) = self.entries.get_mut(parent) {
                children.remove(&root_path);
            }
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(root_path);

        while let Some(path) = to_remove.pop_front() {
            if let Some(Entry::Dir { children }) = self.entries.remove(&path) {
                to_remove.extend(children);
            }
        }
    }
}

#[derive(Debug)]
enum Entry {
    File { contents: Vec<u8> },

    Dir { children: BTreeSet<PathBuf> },
}

impl StorageBackend for InMemoryStorage {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        let inner = self.lock();

        match inner.entries.get(path) {
            Some(Entry::File { contents }) => Ok(contents.clone()),
            Some(Entry::Dir { .. }) => must_be_file(path),
            None => not_found(path),
        }
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut inner = self.lock();

        inner.load_snapshot(path.to_path_buf(), StorageSnapshot::file(data))
    }

    fn exists(&mut self, path: &Path) -> io::Result<bool> {
        let inner = self.lock();
        Ok(inner.entries.contains_key(path))
    }

    fn read_dir(&mut self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let inner = self.lock();

        match inner.entries.get(path) {
            Some(Entry::Dir { children }) => Ok(children.iter().cloned().collect()),
            Some(Entry::File { .. }) => must_be_dir(path),
            None => not_found(path),
        }
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        let mut inner = self.lock();
        inner.ensure_dir(path)
    }
}

fn must_be_file<T>(path: &Path) -> io::Result<T> {
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!("path {} was a directory, but must be a file", path.display()),
    ))
}

fn must_be_dir<T>(path: &Path) -> io::Result<T> {
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!("path {} was a file, but must be a directory", path.display()),
    ))
}

fn not_found<T>(path: &Path) -> io::Result<T> {
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("path {} not found", path.display()),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::Storage;

    #[test]
    fn load_snapshot_and_enumerate() {
        let mut backend = InMemoryStorage::new();
        backend
            .load_snapshot(
                "/project",
                StorageSnapshot::dir([
                    ("scene.json", StorageSnapshot::file("{}")),
                    (
                        "scene",
                        StorageSnapshot::dir([("wood.png", StorageSnapshot::file("png"))]),
                    ),
                ]),
            )
            .unwrap();

        let storage = Storage::new(backend.clone());

        assert_eq!(
            storage.read_dir("/project").unwrap(),
            vec![
                PathBuf::from("/project/scene"),
                PathBuf::from("/project/scene.json"),
            ]
        );

        backend.remove("/project/scene");
        assert!(!storage.exists("/project/scene/wood.png").unwrap());
        assert_eq!(
            storage.read_dir("/project").unwrap(),
            vec![PathBuf::from("/project/scene.json")]
        );
    }

    #[test]
    fn writes_can_be_captured() {
        let backend = InMemoryStorage::new();
        let storage = Storage::new(backend.clone());

        storage.write("/project/level.editorproject", "{}").unwrap();
        storage.write("/project/scene/wood.png", "png").unwrap();

        assert_eq!(
            backend.snapshot("/project"),
            Some(StorageSnapshot::dir([
                ("level.editorproject", StorageSnapshot::file("{}")),
                (
                    "scene",
                    StorageSnapshot::dir([("wood.png", StorageSnapshot::file("png"))]),
                ),
            ]))
        );
        assert_eq!(backend.snapshot("/elsewhere"), None);
    }

    #[test]
    fn file_inside_file_is_an_error() {
        let storage = Storage::new(InMemoryStorage::new());
        storage.write("/a", "file").unwrap();

        assert!(storage.write("/a/b", "nested").is_err());
    }
}
