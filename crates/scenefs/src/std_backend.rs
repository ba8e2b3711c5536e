use std::io;
use std::path::{Path, PathBuf};

use crate::StorageBackend;

/// `StorageBackend` that uses `std::fs`.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct StdStorage;

impl StdStorage {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for StdStorage {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        fs_err::read(path)
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs_err::write(path, data)
    }

    fn exists(&mut self, path: &Path) -> io::Result<bool> {
        Ok(path.exists())
    }

    fn read_dir(&mut self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs_err::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect()
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs_err::create_dir_all(path)
    }
}
