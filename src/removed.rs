//! Tracks baseline entities the user deleted, so that a later import cannot
//! bring them back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    codec::{CodecError, CodecTable},
    diff::strip_bookkeeping,
    scene::{EntityKind, SceneGraph},
};

/// The serialized form of a deleted entity, captured just before disposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EntityKind,

    pub serialization_object: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("no entity with id '{id}' exists in the scene")]
    NotFound { id: String },

    #[error("could not serialize entity '{id}' before removing it")]
    Serialization { id: String, source: CodecError },
}

/// The registry of deleted entities, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovedObjects {
    tombstones: BTreeMap<String, Tombstone>,
}

impl RemovedObjects {
    pub fn new() -> Self {
        RemovedObjects::default()
    }

    /// Serializes and then disposes of an entity, unparenting its children.
    ///
    /// Entities that were added since the baseline leave no tombstone, since
    /// nothing could resurrect them.
    pub fn remove(
        &mut self,
        graph: &mut SceneGraph,
        codecs: &CodecTable,
        id: &str,
    ) -> Result<Option<Tombstone>, RemoveError> {
        let entity = graph
            .get(id)
            .ok_or_else(|| RemoveError::NotFound { id: id.to_owned() })?;

        let tombstone = if entity.metadata.is_added() {
            None
        } else {
            let serialized = codecs.serialize(graph, entity).map_err(|source| {
                RemoveError::Serialization {
                    id: id.to_owned(),
                    source,
                }
            })?;

            Some(Tombstone {
                name: entity.name.clone(),
                kind: entity.kind,
                serialization_object: strip_bookkeeping(serialized),
            })
        };

        dispose(graph, id);

        if let Some(tombstone) = &tombstone {
            log::debug!("Tombstoned {} '{}' ({})", tombstone.kind, tombstone.name, id);
            self.tombstones.insert(id.to_owned(), tombstone.clone());
        }

        Ok(tombstone)
    }

    pub fn tombstones(&self) -> &BTreeMap<String, Tombstone> {
        &self.tombstones
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tombstones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tombstones.is_empty()
    }

    /// Drops a tombstone, for when a live entity reuses the id.
    pub fn forget(&mut self, id: &str) -> Option<Tombstone> {
        self.tombstones.remove(id)
    }

    /// Loads tombstones persisted in a project document.
    pub fn restore(&mut self, tombstones: &BTreeMap<String, Tombstone>) {
        for (id, tombstone) in tombstones {
            self.tombstones.insert(id.clone(), tombstone.clone());
        }
    }

    /// Disposes of every live entity that has a tombstone. Returns the ids
    /// that were disposed of.
    pub fn enforce(&self, graph: &mut SceneGraph) -> Vec<String> {
        let doomed: Vec<String> = graph
            .iter()
            .filter(|entity| self.tombstones.contains_key(&entity.id))
            .map(|entity| entity.id.clone())
            .collect();

        for id in &doomed {
            log::debug!("Disposing of tombstoned entity {}", id);
            dispose(graph, id);
        }

        doomed
    }

    pub fn clear(&mut self) {
        self.tombstones.clear();
    }
}

fn dispose(graph: &mut SceneGraph, id: &str) {
    let children: Vec<String> = graph
        .children_of(id)
        .map(|child| child.id.clone())
        .collect();

    for child in children {
        graph.edit(&child, |entity| {
            entity.fields.remove("parentId");
        });
    }

    graph.remove(id);
}
