use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Records how an entity or auxiliary record differs from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeTag {
    /// Did not exist when the baseline was loaded.
    Added,

    /// Existed in the baseline and has been mutated since.
    Modified,
}

/// Holds at most one [`ChangeTag`] and enforces how tags may move.
///
/// Once something is tagged as added it stays added: a later modification of
/// a brand new entity still needs the whole entity exported, not a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTags(Option<ChangeTag>);

impl ChangeTags {
    pub fn added() -> Self {
        ChangeTags(Some(ChangeTag::Added))
    }

    pub fn tag(&mut self, tag: ChangeTag) {
        match (self.0, tag) {
            (Some(ChangeTag::Added), ChangeTag::Modified) => {}
            _ => self.0 = Some(tag),
        }
    }

    pub fn query(&self) -> Option<ChangeTag> {
        self.0
    }

    pub fn is_added(&self) -> bool {
        self.0 == Some(ChangeTag::Added)
    }

    pub fn is_modified(&self) -> bool {
        self.0 == Some(ChangeTag::Modified)
    }

    pub fn is_tagged(&self) -> bool {
        self.0.is_some()
    }
}

/// The serialized form of an entity as it was when the baseline was loaded.
///
/// Snapshots are immutable and shared, so cloning an entity never copies its
/// baseline data.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalSnapshot(Arc<Map<String, Value>>);

impl OriginalSnapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        OriginalSnapshot(Arc::new(fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Bookkeeping attached to every entity in the scene graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMetadata {
    tags: ChangeTags,
    original: Option<OriginalSnapshot>,

    /// Set on meshes that were synthesized only to act as the emitter of a
    /// particle system. These never travel as nodes.
    pub placeholder_emitter: bool,

    /// Set on the camera the editor itself looks through. Its pose travels
    /// with the global configuration instead of as a node.
    pub editor_camera: bool,

    /// Free-form metadata owned by the user, persisted with the entity.
    pub user: Map<String, Value>,
}

impl EntityMetadata {
    pub fn new() -> Self {
        EntityMetadata::default()
    }

    pub fn placeholder_emitter(self, placeholder_emitter: bool) -> Self {
        Self {
            placeholder_emitter,
            ..self
        }
    }

    pub fn editor_camera(self, editor_camera: bool) -> Self {
        Self {
            editor_camera,
            ..self
        }
    }

    pub fn tag(&mut self, tag: ChangeTag) {
        self.tags.tag(tag);
    }

    pub fn query_tag(&self) -> Option<ChangeTag> {
        self.tags.query()
    }

    pub fn tags(&self) -> ChangeTags {
        self.tags
    }

    pub fn is_added(&self) -> bool {
        self.tags.is_added()
    }

    pub fn is_modified(&self) -> bool {
        self.tags.is_modified()
    }

    /// Captures the baseline form of this entity. Only the first capture
    /// sticks; returns whether this call was it.
    pub fn snapshot(&mut self, serialized: Map<String, Value>) -> bool {
        if self.original.is_some() {
            return false;
        }

        self.original = Some(OriginalSnapshot::new(serialized));
        true
    }

    pub fn snapshot_of(&self) -> Option<&OriginalSnapshot> {
        self.original.as_ref()
    }
}
