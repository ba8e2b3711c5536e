use std::collections::BTreeMap;
use std::path::{Component, Path};

/// A tree of files. Used to seed an [`InMemoryStorage`](crate::InMemoryStorage)
/// and to capture what a save wrote to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSnapshot {
    File {
        contents: Vec<u8>,
    },

    Dir {
        children: BTreeMap<String, StorageSnapshot>,
    },
}

impl StorageSnapshot {
    pub fn file<C: Into<Vec<u8>>>(contents: C) -> Self {
        Self::File {
            contents: contents.into(),
        }
    }

    pub fn dir<K: Into<String>, I: IntoIterator<Item = (K, StorageSnapshot)>>(children: I) -> Self {
        Self::Dir {
            children: children
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    /// A file's contents as UTF-8. `None` for directories and binary files.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::File { contents } => std::str::from_utf8(contents).ok(),
            Self::Dir { .. } => None,
        }
    }

    /// Looks up a descendant by a relative path like `scene/wood.png`.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&StorageSnapshot> {
        let mut current = self;

        for component in path.as_ref().components() {
            let name = match component {
                Component::Normal(name) => name.to_str()?,
                Component::CurDir => continue,
                _ => return None,
            };

            current = match current {
                Self::Dir { children } => children.get(name)?,
                Self::File { .. } => return None,
            };
        }

        Some(current)
    }

    /// The names of a directory's direct children, in order. Empty for a
    /// file.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Dir { children } => children.keys().map(String::as_str).collect(),
            Self::File { .. } => Vec::new(),
        }
    }
}
