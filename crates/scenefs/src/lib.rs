/*!
Storage abstraction used to persist scene projects.

Scene projects are written to and read from a storage backend. The code that
assembles or reconciles a project only ever hands over (or receives) the final
bytes, so the backend can be swapped freely.

## Backends
* `StdStorage`, which uses `std::fs` through `fs-err`
* `InMemoryStorage`, a simple in-memory tree useful for testing
*/

mod in_memory;
mod snapshot;
mod std_backend;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub use in_memory::InMemoryStorage;
pub use snapshot::StorageSnapshot;
pub use std_backend::StdStorage;

mod sealed {
    use super::*;

    /// Sealing trait for StorageBackend.
    pub trait Sealed {}

    impl Sealed for StdStorage {}
    impl Sealed for InMemoryStorage {}
}

/// Trait that transforms `io::Result<T>` into `io::Result<Option<T>>`.
///
/// `Ok(None)` takes the place of IO errors whose `io::ErrorKind` is `NotFound`.
pub trait IoResultExt<T> {
    fn with_not_found(self) -> io::Result<Option<T>>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_not_found(self) -> io::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(err) => {
                if err.kind() == io::ErrorKind::NotFound {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// Backend that can be used to create a `Storage`.
///
/// This trait is sealed and cannot not be implemented outside this crate.
pub trait StorageBackend: sealed::Sealed + Send + 'static {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn exists(&mut self, path: &Path) -> io::Result<bool>;
    fn read_dir(&mut self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;
}

/// A storage location with a configurable backend.
///
/// Every operation takes a lock on the backend, so a `Storage` can be shared
/// between the session that saves a project and whatever enumerates it.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Mutex<Box<dyn StorageBackend>>>,
}

impl Storage {
    /// Creates a new `Storage` backed by the local disk.
    pub fn new_default() -> Self {
        Self::new(StdStorage::new())
    }

    pub fn new<B: StorageBackend>(backend: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(backend))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn StorageBackend>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Roughly equivalent to [`std::fs::read`][std::fs::read].
    ///
    /// [std::fs::read]: https://doc.rust-lang.org/stable/std/fs/fn.read.html
    pub fn read<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<u8>> {
        self.lock().read(path.as_ref())
    }

    /// Reads a file and decodes it as UTF-8.
    pub fn read_to_string<P: AsRef<Path>>(&self, path: P) -> io::Result<String> {
        let path = path.as_ref();
        let contents = self.read(path)?;

        String::from_utf8(contents).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("File was not valid UTF-8: {}", path.display()),
            )
        })
    }

    /// Writes a file, creating any missing parent directories first.
    pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(&self, path: P, contents: C) -> io::Result<()> {
        let path = path.as_ref();
        let mut backend = self.lock();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                backend.create_dir_all(parent)?;
            }
        }

        backend.write(path, contents.as_ref())
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> io::Result<bool> {
        self.lock().exists(path.as_ref())
    }

    /// Lists the direct children of a directory, sorted by path.
    pub fn read_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<PathBuf>> {
        let mut entries = self.lock().read_dir(path.as_ref())?;
        entries.sort();
        Ok(entries)
    }

    pub fn create_dir_all<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.lock().create_dir_all(path.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_creates_parents() {
        let storage = Storage::new(InMemoryStorage::new());

        storage.write("/project/scene/wood.png", b"png").unwrap();

        assert!(storage.exists("/project/scene").unwrap());
        assert_eq!(
            storage.read_dir("/project").unwrap(),
            vec![PathBuf::from("/project/scene")]
        );
        assert_eq!(storage.read("/project/scene/wood.png").unwrap(), b"png");
    }

    #[test]
    fn missing_file_is_none() {
        let storage = Storage::new(InMemoryStorage::new());

        let contents = storage.read("/nothing.json").with_not_found().unwrap();
        assert_eq!(contents, None);
    }

    #[test]
    fn read_to_string_rejects_bad_unicode() {
        let storage = Storage::new(InMemoryStorage::new());
        storage.write("/bad.json", [0xff, 0xfe]).unwrap();

        let err = storage.read_to_string("/bad.json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
