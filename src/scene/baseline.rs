//! Reading and writing whole scenes, and capturing the baseline snapshot
//! every later diff is computed against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    codec::{CodecError, CodecTable},
    diff::strip_bookkeeping,
};

use super::{
    Animation, AssetEntry, Entity, GlobalConfiguration, GraphError, InteractionHandler,
    PhysicsImpostor, SceneFileEntry, SceneGraph, UnknownEntityKind,
};

/// The on-disk form of a whole scene.
///
/// Each entity object is its serialized form plus a `type` key and, for
/// nodes, optional `animations`, `physics`, and `actions` keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneFile {
    pub entities: Vec<Map<String, Value>>,
    pub global_configuration: GlobalConfiguration,
    pub assets: BTreeMap<String, Vec<AssetRecord>>,
    pub custom_metadatas: Map<String, Value>,
    pub files: Vec<SceneFileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AnimationRecord {
    name: String,

    #[serde(default)]
    data: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("entity #{index} has no type")]
    MissingType { index: usize },

    #[error("entity #{index} has an unknown type")]
    UnknownType {
        index: usize,
        source: UnknownEntityKind,
    },

    #[error("could not parse entity #{index}")]
    Entity { index: usize, source: CodecError },

    #[error("could not parse the {field} of entity #{index}")]
    Aux {
        index: usize,
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("could not capture the baseline of entity '{id}'")]
    Snapshot { id: String, source: CodecError },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Builds a scene graph from a scene file and captures the baseline snapshot
/// of every entity in it. Nothing in the returned graph is tagged.
pub fn load_scene(file: SceneFile, codecs: &CodecTable) -> Result<SceneGraph, BaselineError> {
    let mut graph = SceneGraph::new();

    for (index, mut object) in file.entities.into_iter().enumerate() {
        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind
                .parse()
                .map_err(|source| BaselineError::UnknownType { index, source })?,
            _ => return Err(BaselineError::MissingType { index }),
        };

        let animations = take_aux::<Vec<AnimationRecord>>(&mut object, "animations", index)?;
        let physics = take_aux::<PhysicsImpostor>(&mut object, "physics", index)?;
        let actions = object.remove("actions");
        let placeholder_emitter = take_flag(&mut object, "placeholderEmitter");
        let editor_camera = take_flag(&mut object, "editorCamera");

        let mut entity = codecs
            .parse(kind, &object)
            .map_err(|source| BaselineError::Entity { index, source })?;

        entity.animations = animations
            .unwrap_or_default()
            .into_iter()
            .map(|record| Animation::new(record.name, record.data))
            .collect();
        entity.physics = physics;
        entity.handler = actions
            .filter(|actions| !actions.is_null())
            .map(InteractionHandler::new);
        entity.metadata.placeholder_emitter = placeholder_emitter;
        entity.metadata.editor_camera = editor_camera;

        graph.insert(entity)?;
    }

    graph.global = file.global_configuration;
    graph.assets = file
        .assets
        .into_iter()
        .map(|(component, records)| {
            let entries: Vec<AssetEntry> = records
                .into_iter()
                .map(|record| AssetEntry::new(record.name, record.data))
                .collect();

            (component, entries)
        })
        .collect();
    graph.custom_metadata = file.custom_metadatas;
    graph.files = file.files;

    capture_snapshots(&mut graph, codecs)?;

    Ok(graph)
}

/// Records the current serialized form of every entity as its baseline.
/// Entities that already carry a snapshot keep it.
pub fn capture_snapshots(graph: &mut SceneGraph, codecs: &CodecTable) -> Result<(), BaselineError> {
    let mut captured = Vec::with_capacity(graph.len());

    for entity in graph.iter() {
        let serialized = codecs
            .serialize(graph, entity)
            .map_err(|source| BaselineError::Snapshot {
                id: entity.id.clone(),
                source,
            })?;

        captured.push((entity.id.clone(), strip_bookkeeping(serialized)));
    }

    for (id, serialized) in captured {
        if let Some(entity) = graph.get_mut(&id) {
            entity.metadata.snapshot(serialized);
        }
    }

    log::trace!("Captured baseline snapshots for {} entities", graph.len());

    Ok(())
}

/// Writes the graph's current state as a scene file.
pub fn write_scene(graph: &SceneGraph, codecs: &CodecTable) -> Result<SceneFile, CodecError> {
    let mut entities = Vec::with_capacity(graph.len());

    for entity in graph.iter() {
        entities.push(entity_record(graph, codecs, entity)?);
    }

    let assets = graph
        .assets
        .iter()
        .map(|(component, entries)| {
            let records: Vec<AssetRecord> = entries
                .iter()
                .map(|entry| AssetRecord {
                    name: entry.name.clone(),
                    data: entry.data.clone(),
                })
                .collect();

            (component.clone(), records)
        })
        .collect();

    Ok(SceneFile {
        entities,
        global_configuration: graph.global.clone(),
        assets,
        custom_metadatas: graph.custom_metadata.clone(),
        files: graph.files.clone(),
    })
}

fn entity_record(
    graph: &SceneGraph,
    codecs: &CodecTable,
    entity: &Entity,
) -> Result<Map<String, Value>, CodecError> {
    let mut object = strip_bookkeeping(codecs.serialize(graph, entity)?);
    object.insert("type".to_owned(), Value::String(entity.kind.as_str().to_owned()));

    if !entity.animations.is_empty() {
        let animations = entity
            .animations
            .iter()
            .map(|animation| AnimationRecord {
                name: animation.name.clone(),
                data: animation.data.clone(),
            })
            .collect::<Vec<_>>();

        object.insert("animations".to_owned(), to_value(&animations)?);
    }

    if let Some(physics) = &entity.physics {
        object.insert("physics".to_owned(), to_value(physics)?);
    }

    if let Some(handler) = &entity.handler {
        object.insert("actions".to_owned(), handler.actions.clone());
    }

    if entity.metadata.placeholder_emitter {
        object.insert("placeholderEmitter".to_owned(), Value::Bool(true));
    }

    if entity.metadata.editor_camera {
        object.insert("editorCamera".to_owned(), Value::Bool(true));
    }

    Ok(object)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CodecError> {
    serde_json::to_value(value).map_err(|err| CodecError::Engine(err.to_string()))
}

fn take_aux<T: serde::de::DeserializeOwned>(
    object: &mut Map<String, Value>,
    field: &'static str,
    index: usize,
) -> Result<Option<T>, BaselineError> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| BaselineError::Aux {
                index,
                field,
                source,
            }),
    }
}

fn take_flag(object: &mut Map<String, Value>, field: &str) -> bool {
    matches!(object.remove(field), Some(Value::Bool(true)))
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::json;

    use crate::scene::EntityKind;

    fn scene_file(value: Value) -> SceneFile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn loaded_entities_are_untagged_with_snapshots() {
        let file = scene_file(json!({
            "entities": [
                { "type": "Mesh", "id": "cube1", "name": "Cube", "castShadow": false },
                { "type": "Light", "id": "sun", "intensity": 1.0 },
            ],
        }));

        let graph = load_scene(file, &CodecTable::standard()).unwrap();
        let cube = graph.get("cube1").unwrap();

        assert_eq!(cube.kind, EntityKind::Mesh);
        assert_eq!(cube.metadata.query_tag(), None);
        assert_eq!(
            cube.metadata.snapshot_of().unwrap().fields(),
            json!({ "id": "cube1", "name": "Cube", "castShadow": false })
                .as_object()
                .unwrap()
        );
        assert!(graph.get("sun").unwrap().metadata.snapshot_of().is_some());
    }

    #[test]
    fn aux_records_are_loaded() {
        let file = scene_file(json!({
            "entities": [{
                "type": "Mesh",
                "id": "cube1",
                "animations": [{ "name": "spin", "data": { "frames": 30 } }],
                "physics": {
                    "physicsImpostor": 1,
                    "physicsMass": 2.0,
                    "physicsFriction": 0.5,
                    "physicsRestitution": 0.1,
                },
                "actions": { "triggers": [] },
            }],
        }));

        let graph = load_scene(file, &CodecTable::standard()).unwrap();
        let cube = graph.get("cube1").unwrap();

        assert_eq!(cube.animations.len(), 1);
        assert_eq!(cube.physics.as_ref().unwrap().physics_mass, 2.0);
        assert!(cube.handler.is_some());
        assert!(!cube.has_added_aux());
        assert!(cube.get("animations").is_none());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let file = scene_file(json!({ "entities": [{ "type": "Scene", "id": "s" }] }));

        assert!(matches!(
            load_scene(file, &CodecTable::standard()),
            Err(BaselineError::UnknownType { index: 0, .. })
        ));
    }

    #[test]
    fn write_then_load_keeps_entities() {
        let file = scene_file(json!({
            "entities": [
                { "type": "Mesh", "id": "emitter", "placeholderEmitter": true },
                { "type": "ParticleSystem", "id": "p1", "emitterId": "emitter" },
            ],
            "customMetadatas": { "level": 3 },
        }));

        let codecs = CodecTable::standard();
        let graph = load_scene(file, &codecs).unwrap();
        let written = write_scene(&graph, &codecs).unwrap();
        let reloaded = load_scene(written, &codecs).unwrap();

        assert!(reloaded.get("emitter").unwrap().metadata.placeholder_emitter);
        assert_eq!(reloaded.get("p1").unwrap().link("emitterId"), Some("emitter"));
        assert_eq!(reloaded.custom_metadata["level"], json!(3));
    }
}
