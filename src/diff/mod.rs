//! Computes the minimal set of fields that must be persisted for an entity,
//! given its current serialized form and the snapshot captured when the
//! baseline was loaded.

mod value_eq;

pub use value_eq::{sequence_differs, value_eq};

use serde_json::{Map, Value};

use crate::scene::{Entity, FieldKind, OriginalSnapshot, SceneGraph};

/// Keys every serialized entity carries or that hold bookkeeping, so their
/// absence never means a field was cleared.
const UNCLEARABLE_FIELDS: [&str; 3] = ["id", "name", "metadata"];

/// The persisted form of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// The entity has no baseline; this is its whole serialized form.
    Full(Map<String, Value>),

    /// Only the fields that differ from the baseline, plus `id`.
    Partial(Map<String, Value>),
}

impl Patch {
    pub fn is_full(&self) -> bool {
        matches!(self, Patch::Full(_))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        match self {
            Patch::Full(fields) | Patch::Partial(fields) => fields,
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            Patch::Full(fields) | Patch::Partial(fields) => fields,
        }
    }
}

/// Diffs an entity's current serialized form against its baseline snapshot.
///
/// A baseline field that is absent from the current form is reported as
/// `null`, which clears it when the patch is applied.
pub fn diff(graph: &SceneGraph, entity: &Entity, current: Map<String, Value>) -> Patch {
    let current = strip_bookkeeping(current);

    let original = match entity.metadata.snapshot_of() {
        Some(original) => original,
        None => return Patch::Full(current),
    };

    let mut patch = Map::new();

    for (key, value) in &current {
        if key == "id" {
            continue;
        }

        if field_changed(graph, entity, original, key, value) {
            patch.insert(key.clone(), value.clone());
        }
    }

    for key in original.fields().keys() {
        if !current.contains_key(key) && !UNCLEARABLE_FIELDS.contains(&key.as_str()) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    let id = current
        .get("id")
        .cloned()
        .unwrap_or_else(|| Value::String(entity.id.clone()));
    patch.insert("id".to_owned(), id);

    Patch::Partial(patch)
}

fn field_changed(
    graph: &SceneGraph,
    entity: &Entity,
    original: &OriginalSnapshot,
    key: &str,
    value: &Value,
) -> bool {
    let base = match original.get(key) {
        Some(base) => base,
        None => return true,
    };

    match entity.kind.field_kind(key, value) {
        FieldKind::Primitive | FieldKind::Link | FieldKind::Structured => !value_eq(value, base),
        FieldKind::Sequence => match (value, base) {
            (Value::Array(current), Value::Array(base)) => sequence_differs(current, base),
            _ => true,
        },
        FieldKind::EntityRef => reference_changed(graph, value, base),
    }
}

/// An embedded reference is reported when it now points at an entity that
/// did not exist in the baseline, or when the referenced name changed.
fn reference_changed(graph: &SceneGraph, current: &Value, base: &Value) -> bool {
    let target_added = current
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| graph.get(id))
        .map_or(false, |target| target.metadata.is_added());

    if target_added {
        return true;
    }

    match base {
        Value::Object(base) => current.get("name") != base.get("name"),
        _ => true,
    }
}

/// Removes change-tracking bookkeeping from a serialized entity so it never
/// reaches a project document.
pub fn strip_bookkeeping(mut serialized: Map<String, Value>) -> Map<String, Value> {
    let now_empty = match serialized.get_mut("metadata") {
        Some(Value::Object(metadata)) => {
            metadata.remove("original");
            metadata.is_empty()
        }
        _ => false,
    };

    if now_empty {
        serialized.remove("metadata");
    }

    serialized
}
