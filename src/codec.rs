//! Converts entities to and from their serialized object form.
//!
//! Every entity kind is looked up in a [`CodecTable`] instead of being
//! dispatched on dynamically, so callers can register their own codecs for
//! kinds that need special handling.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::scene::{Entity, EntityKind, FieldKind, SceneGraph};

pub type SerializeFn = fn(&SceneGraph, &Entity) -> Result<Map<String, Value>, CodecError>;
pub type ParseFn = fn(EntityKind, &Map<String, Value>) -> Result<Entity, CodecError>;
pub type ParseIntoFn = fn(&mut Entity, &Map<String, Value>) -> Result<(), CodecError>;

/// The serialize, parse, and parse-into-existing capabilities for one kind.
#[derive(Clone, Copy)]
pub struct Codec {
    pub serialize: SerializeFn,
    pub parse: ParseFn,
    pub parse_into: ParseIntoFn,
}

impl Codec {
    pub fn generic() -> Self {
        Codec {
            serialize: serialize_entity,
            parse: parse_entity,
            parse_into: parse_into_entity,
        }
    }
}

#[derive(Clone)]
pub struct CodecTable {
    codecs: HashMap<EntityKind, Codec>,
}

impl CodecTable {
    /// A table holding the generic codec for every known kind.
    pub fn standard() -> Self {
        let codecs = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, Codec::generic()))
            .collect();

        CodecTable { codecs }
    }

    pub fn empty() -> Self {
        CodecTable {
            codecs: HashMap::new(),
        }
    }

    pub fn with(mut self, kind: EntityKind, codec: Codec) -> Self {
        self.codecs.insert(kind, codec);
        self
    }

    pub fn get(&self, kind: EntityKind) -> Result<&Codec, CodecError> {
        self.codecs.get(&kind).ok_or(CodecError::Unsupported(kind))
    }

    pub fn serialize(
        &self,
        graph: &SceneGraph,
        entity: &Entity,
    ) -> Result<Map<String, Value>, CodecError> {
        (self.get(entity.kind)?.serialize)(graph, entity)
    }

    pub fn parse(
        &self,
        kind: EntityKind,
        object: &Map<String, Value>,
    ) -> Result<Entity, CodecError> {
        (self.get(kind)?.parse)(kind, object)
    }

    pub fn parse_into(
        &self,
        entity: &mut Entity,
        object: &Map<String, Value>,
    ) -> Result<(), CodecError> {
        (self.get(entity.kind)?.parse_into)(entity, object)
    }
}

impl Default for CodecTable {
    fn default() -> Self {
        CodecTable::standard()
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no codec is registered for entity type {0}")]
    Unsupported(EntityKind),

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("data for '{found}' cannot be applied to entity '{expected}'")]
    IdMismatch { expected: String, found: String },

    #[error("{0}")]
    Engine(String),
}

impl CodecError {
    pub(crate) fn invalid_field(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }
}

/// Writes an entity in the engine's serialized form: id and name, every
/// field, reference fields expanded to `{ id, name }`, and the metadata
/// object including the baseline snapshot.
pub fn serialize_entity(
    graph: &SceneGraph,
    entity: &Entity,
) -> Result<Map<String, Value>, CodecError> {
    let mut object = Map::new();
    object.insert("id".to_owned(), Value::String(entity.id.clone()));
    object.insert("name".to_owned(), Value::String(entity.name.clone()));

    for (key, value) in &entity.fields {
        let value = match value {
            Value::String(target) if is_embedded_ref(entity.kind, key) => {
                embed_reference(graph, target)
            }
            _ => value.clone(),
        };

        object.insert(key.clone(), value);
    }

    let metadata = &entity.metadata;
    if !metadata.user.is_empty() || metadata.snapshot_of().is_some() {
        let mut serialized = metadata.user.clone();

        if let Some(original) = metadata.snapshot_of() {
            serialized.insert(
                "original".to_owned(),
                Value::Object(original.fields().clone()),
            );
        }

        object.insert("metadata".to_owned(), Value::Object(serialized));
    }

    Ok(object)
}

pub fn parse_entity(kind: EntityKind, object: &Map<String, Value>) -> Result<Entity, CodecError> {
    let id = match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(_) => return Err(CodecError::invalid_field("id", "a non-empty string")),
        None => return Err(CodecError::MissingField("id")),
    };

    let mut entity = Entity::new(kind, id);
    apply_object(&mut entity, object)?;

    Ok(entity)
}

pub fn parse_into_entity(
    entity: &mut Entity,
    object: &Map<String, Value>,
) -> Result<(), CodecError> {
    if let Some(id) = object.get("id") {
        match id.as_str() {
            Some(found) if found == entity.id => {}
            Some(found) => {
                return Err(CodecError::IdMismatch {
                    expected: entity.id.clone(),
                    found: found.to_owned(),
                })
            }
            None => return Err(CodecError::invalid_field("id", "a non-empty string")),
        }
    }

    // Validate into a scratch copy so a bad patch leaves the entity untouched.
    let mut updated = entity.clone();
    apply_object(&mut updated, object)?;
    *entity = updated;

    Ok(())
}

fn apply_object(entity: &mut Entity, object: &Map<String, Value>) -> Result<(), CodecError> {
    for (key, value) in object {
        match key.as_str() {
            "id" => {}
            "name" => match value {
                Value::String(name) => entity.name = name.clone(),
                _ => return Err(CodecError::invalid_field("name", "a string")),
            },
            "metadata" => match value {
                Value::Object(metadata) => {
                    for (key, value) in metadata {
                        if key != "original" {
                            entity.metadata.user.insert(key.clone(), value.clone());
                        }
                    }
                }
                Value::Null => {}
                _ => return Err(CodecError::invalid_field("metadata", "an object")),
            },
            _ if value.is_null() => {
                entity.fields.remove(key);
            }
            _ => {
                let value = parse_field(entity.kind, key, value)?;
                entity.fields.insert(key.clone(), value);
            }
        }
    }

    validate(entity)
}

fn parse_field(kind: EntityKind, key: &str, value: &Value) -> Result<Value, CodecError> {
    let declared = kind
        .reference_fields()
        .find(|(field, _)| *field == key)
        .map(|(_, declared)| declared);

    match (declared, value) {
        (Some(FieldKind::EntityRef), Value::Object(reference)) => match reference.get("id") {
            Some(Value::String(id)) => Ok(Value::String(id.clone())),
            _ => Err(CodecError::invalid_field(key, "a reference with a string id")),
        },
        (Some(FieldKind::EntityRef), Value::String(id)) => Ok(Value::String(id.clone())),
        (Some(FieldKind::EntityRef), _) => {
            Err(CodecError::invalid_field(key, "a reference object"))
        }
        (Some(FieldKind::Link), Value::String(_)) => Ok(value.clone()),
        (Some(FieldKind::Link), _) => Err(CodecError::invalid_field(key, "an entity id")),
        _ => Ok(value.clone()),
    }
}

fn validate(entity: &Entity) -> Result<(), CodecError> {
    if entity.kind.is_node() {
        for field in ["position", "rotation", "scaling"] {
            if let Some(value) = entity.get(field) {
                if !is_vector3(value) {
                    return Err(CodecError::invalid_field(field, "an array of three numbers"));
                }
            }
        }
    }

    if entity.kind == EntityKind::ParticleSystem {
        if let Some(capacity) = entity.get("capacity") {
            if capacity.as_u64().is_none() {
                return Err(CodecError::invalid_field("capacity", "a non-negative integer"));
            }
        }
    }

    Ok(())
}

fn is_vector3(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.len() == 3 && items.iter().all(Value::is_number),
        _ => false,
    }
}

fn is_embedded_ref(kind: EntityKind, key: &str) -> bool {
    kind.reference_fields()
        .any(|(field, declared)| field == key && declared == FieldKind::EntityRef)
}

fn embed_reference(graph: &SceneGraph, target: &str) -> Value {
    let mut reference = Map::new();
    reference.insert("id".to_owned(), Value::String(target.to_owned()));

    if let Some(entity) = graph.get(target) {
        reference.insert("name".to_owned(), Value::String(entity.name.clone()));
    }

    Value::Object(reference)
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn texture_slots_embed_name() {
        let mut graph = SceneGraph::new();
        graph
            .insert(Entity::new(EntityKind::Texture, "t1").name("brick.png"))
            .unwrap();

        let material = Entity::new(EntityKind::Material, "m1").field("diffuseTexture", "t1");
        let serialized = serialize_entity(&graph, &material).unwrap();

        assert_eq!(
            serialized.get("diffuseTexture"),
            Some(&json!({ "id": "t1", "name": "brick.png" }))
        );
    }

    #[test]
    fn parse_collapses_references() {
        let entity = parse_entity(
            EntityKind::Material,
            &object(json!({
                "id": "m1",
                "name": "Brick",
                "diffuseTexture": { "id": "t1", "name": "brick.png" },
                "metadata": { "author": "me", "original": { "id": "m1" } },
            })),
        )
        .unwrap();

        assert_eq!(entity.name, "Brick");
        assert_eq!(entity.link("diffuseTexture"), Some("t1"));
        assert_eq!(entity.metadata.user, object(json!({ "author": "me" })));
        assert!(entity.metadata.snapshot_of().is_none());
    }

    #[test]
    fn parse_requires_id() {
        let error = parse_entity(EntityKind::Light, &object(json!({ "name": "L" }))).unwrap_err();
        assert!(matches!(error, CodecError::MissingField("id")));
    }

    #[test]
    fn bad_patch_leaves_entity_untouched() {
        let mut entity = Entity::new(EntityKind::Mesh, "cube1").field("castShadow", false);
        let before = entity.clone();

        let result = parse_into_entity(
            &mut entity,
            &object(json!({ "castShadow": true, "position": [1, 2] })),
        );

        assert!(result.is_err());
        assert_eq!(entity, before);
    }

    #[test]
    fn null_clears_a_field() {
        let mut entity = Entity::new(EntityKind::Mesh, "cube1")
            .field("parentId", "root")
            .field("castShadow", false);

        parse_into_entity(
            &mut entity,
            &object(json!({ "id": "cube1", "parentId": null, "castShadow": true })),
        )
        .unwrap();

        assert_eq!(entity.parent_id(), None);
        assert!(entity.get("parentId").is_none());
        assert_eq!(entity.get("castShadow"), Some(&json!(true)));
    }

    #[test]
    fn parse_into_rejects_other_id() {
        let mut entity = Entity::new(EntityKind::Mesh, "cube1");
        let error = parse_into_entity(&mut entity, &object(json!({ "id": "cube2" }))).unwrap_err();

        assert!(matches!(error, CodecError::IdMismatch { .. }));
    }

    #[test]
    fn missing_codec_is_unsupported() {
        let table = CodecTable::empty();
        let graph = SceneGraph::new();
        let entity = Entity::new(EntityKind::Sound, "s1");

        assert!(matches!(
            table.serialize(&graph, &entity),
            Err(CodecError::Unsupported(EntityKind::Sound))
        ));
    }
}
