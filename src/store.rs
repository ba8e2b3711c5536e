//! Persists project documents and scene files through a [`Storage`].

use std::{
    io,
    path::{Path, PathBuf},
};

use scenefs::{IoResultExt, Storage};
use serde::Serialize;
use thiserror::Error;

use crate::{
    codec::{CodecError, CodecTable},
    project::ProjectDocument,
    scene::{load_scene, write_scene, BaselineError, SceneFile, SceneGraph},
};

pub const PROJECT_EXTENSION: &str = "editorproject";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("could not access {}", .path.display())]
    Io { source: io::Error, path: PathBuf },

    #[error("malformed project document at {}", .path.display())]
    MalformedDocument {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("malformed scene file at {}", .path.display())]
    MalformedScene {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("could not build the scene stored at {}", .path.display())]
    Baseline { source: BaselineError, path: PathBuf },

    #[error("could not serialize the scene")]
    Codec { source: CodecError },

    #[error("could not encode {}", .path.display())]
    Encode {
        source: serde_json::Error,
        path: PathBuf,
    },
}

impl StoreError {
    fn io(source: io::Error, path: &Path) -> Self {
        Self::Io {
            source,
            path: path.to_owned(),
        }
    }
}

/// Where the project named `name` lives inside `dir`.
pub fn project_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, PROJECT_EXTENSION))
}

/// Writes a project document as tab-indented JSON.
pub fn save_project(
    storage: &Storage,
    path: &Path,
    document: &ProjectDocument,
) -> Result<(), StoreError> {
    let contents = to_tabbed_json(document).map_err(|source| StoreError::Encode {
        source,
        path: path.to_owned(),
    })?;

    storage
        .write(path, contents)
        .map_err(|err| StoreError::io(err, path))?;

    log::debug!("Saved project to {}", path.display());
    Ok(())
}

pub fn load_project(storage: &Storage, path: &Path) -> Result<ProjectDocument, StoreError> {
    let contents = read_existing(storage, path)?;

    serde_json::from_str(&contents).map_err(|source| StoreError::MalformedDocument {
        source,
        path: path.to_owned(),
    })
}

/// Lists the project documents stored directly inside `dir`.
pub fn find_projects(storage: &Storage, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = storage
        .read_dir(dir)
        .with_not_found()
        .map_err(|err| StoreError::io(err, dir))?
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .filter(|path| path.extension().map_or(false, |ext| ext == PROJECT_EXTENSION))
        .collect())
}

/// Loads a scene file as a baseline: every entity untagged, with its
/// snapshot captured.
pub fn load_scene_file(
    storage: &Storage,
    path: &Path,
    codecs: &CodecTable,
) -> Result<SceneGraph, StoreError> {
    let contents = read_existing(storage, path)?;

    let file: SceneFile =
        serde_json::from_str(&contents).map_err(|source| StoreError::MalformedScene {
            source,
            path: path.to_owned(),
        })?;

    let mut graph = load_scene(file, codecs).map_err(|source| StoreError::Baseline {
        source,
        path: path.to_owned(),
    })?;

    graph.scene_file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    Ok(graph)
}

pub fn save_scene_file(
    storage: &Storage,
    path: &Path,
    graph: &SceneGraph,
    codecs: &CodecTable,
) -> Result<(), StoreError> {
    let file = write_scene(graph, codecs).map_err(|source| StoreError::Codec { source })?;

    let contents = to_tabbed_json(&file).map_err(|source| StoreError::Encode {
        source,
        path: path.to_owned(),
    })?;

    storage
        .write(path, contents)
        .map_err(|err| StoreError::io(err, path))
}

fn read_existing(storage: &Storage, path: &Path) -> Result<String, StoreError> {
    storage
        .read_to_string(path)
        .with_not_found()
        .map_err(|err| StoreError::io(err, path))?
        .ok_or_else(|| StoreError::NotFound {
            path: path.to_owned(),
        })
}

fn to_tabbed_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut contents = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut contents, formatter);

    value.serialize(&mut serializer)?;
    Ok(contents)
}
