//! Walks the scene graph and assembles the project document describing how
//! it differs from the baseline.

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    codec::{CodecError, CodecTable},
    diff::{diff, strip_bookkeeping},
    interaction::InteractionToggle,
    project::{
        AnimationFragment, AssetFragment, Fragment, FragmentExtra, MaterialBinding,
        MaterialExtra, NoExtra, NodeExtra, ParticleExtra, ProjectDocument, RenderTargetExtra,
        ASSETS_EXTENSION_KEY,
    },
    removed::RemovedObjects,
    scene::{Category, ChangeTag, Entity, EntityKind, GlobalConfigurationError, SceneGraph},
    store::{StoreError, PROJECT_EXTENSION},
};

/// Mesh fields that are rebuilt from other sections of the document and so
/// never travel in a modified mesh's patch.
const MESH_DERIVED_FIELDS: [&str; 3] = ["materialIds", "subMeshes", "instances"];

/// Asset components mirrored whole into `customMetadatas` for extensions.
const EXTENSION_ASSET_COMPONENTS: [&str; 2] = ["prefabs", "particles"];

#[derive(Debug, Error)]
#[error("could not serialize {kind} '{name}' ({id})")]
pub struct SerializationFailure {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    pub source: CodecError,
}

/// Why the global configuration could not be written. A document without it
/// would import as if the scene had none.
#[derive(Debug, Error)]
pub enum GlobalExportFailure {
    #[error(transparent)]
    Invalid(#[from] GlobalConfigurationError),

    #[error("the global configuration could not be serialized")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    ConcurrentExportRejected,

    #[error("could not export the global configuration")]
    GlobalConfiguration { source: GlobalExportFailure },

    #[error("{} entities could not be serialized", .failures.len())]
    Serialization { failures: Vec<SerializationFailure> },

    #[error(transparent)]
    Store {
        #[from]
        source: StoreError,
    },
}

/// The result of walking a scene graph. `failures` lists every entity whose
/// codec failed; those entities are missing from the document. When
/// `global_failure` is set, the document's global configuration is null.
#[derive(Debug)]
pub struct Assembled {
    pub document: ProjectDocument,
    pub failures: Vec<SerializationFailure>,
    pub global_failure: Option<GlobalExportFailure>,
}

impl Assembled {
    pub fn into_document(self) -> Result<ProjectDocument, ExportError> {
        if let Some(source) = self.global_failure {
            return Err(ExportError::GlobalConfiguration { source });
        }

        if self.failures.is_empty() {
            Ok(self.document)
        } else {
            Err(ExportError::Serialization {
                failures: self.failures,
            })
        }
    }
}

/// Assembles the project document with the scene's interaction handlers in
/// place, restoring the editor's handlers afterwards.
pub fn export_project(
    graph: &mut SceneGraph,
    toggle: &mut InteractionToggle,
    codecs: &CodecTable,
    removed: &RemovedObjects,
) -> Assembled {
    toggle.toggle(graph);
    let assembled = assemble(graph, codecs, removed);
    toggle.toggle(graph);

    assembled
}

/// Builds the project document for the graph's current state. Entities whose
/// codec fails are reported in [`Assembled::failures`] and left out.
pub fn assemble(graph: &SceneGraph, codecs: &CodecTable, removed: &RemovedObjects) -> Assembled {
    let mut context = ExportContext {
        graph,
        codecs,
        failures: Vec::new(),
        global_failure: None,
    };

    let mut document = ProjectDocument {
        global_configuration: context.global_configuration(),
        ..ProjectDocument::default()
    };

    for entity in graph.iter() {
        match entity.kind.category() {
            Some(Category::Nodes) => document.nodes.extend(context.node(entity)),
            Some(Category::Materials) => document.materials.extend(context.material(entity)),
            Some(Category::Textures) => document.textures.extend(context.plain(entity)),
            Some(Category::ParticleSystems) => {
                document.particle_systems.extend(context.particle_system(entity))
            }
            Some(Category::ShadowGenerators) => {
                document.shadow_generators.extend(context.plain(entity))
            }
            Some(Category::Sounds) => document.sounds.extend(context.plain(entity)),
            Some(Category::RenderTargets) => {
                let extra = RenderTargetExtra {
                    is_probe: entity.kind == EntityKind::ReflectionProbe,
                };
                document.render_targets.extend(context.fragment(entity, extra));
            }
            Some(Category::EffectLayers) => document.effect_layers.extend(context.plain(entity)),
            Some(Category::Gui) => document.gui.extend(context.plain(entity)),
            None => {}
        }
    }

    for (component, entries) in &graph.assets {
        let fragments: Vec<AssetFragment> = entries
            .iter()
            .filter(|entry| entry.tags.is_tagged())
            .map(|entry| AssetFragment {
                name: entry.name.clone(),
                data: entry.data.clone(),
                added: entry.tags.is_added(),
            })
            .collect();

        if !fragments.is_empty() {
            document.assets.insert(component.clone(), fragments);
        }
    }

    document.custom_metadatas = graph.custom_metadata.clone();
    document
        .custom_metadatas
        .insert(ASSETS_EXTENSION_KEY.to_owned(), assets_extension(graph));
    document.files_list = files_list(graph);
    document.removed_objects = removed.tombstones().clone();

    log::debug!(
        "Assembled project document with {} fragments and {} tombstones",
        document.fragment_count(),
        document.removed_objects.len()
    );

    Assembled {
        document,
        failures: context.failures,
        global_failure: context.global_failure,
    }
}

struct ExportContext<'a> {
    graph: &'a SceneGraph,
    codecs: &'a CodecTable,
    failures: Vec<SerializationFailure>,
    global_failure: Option<GlobalExportFailure>,
}

impl<'a> ExportContext<'a> {
    fn serialize(&mut self, entity: &Entity) -> Option<Map<String, Value>> {
        match self.codecs.serialize(self.graph, entity) {
            Ok(serialized) => Some(serialized),
            Err(source) => {
                log::trace!("Serialization of {} failed: {}", entity.id, source);

                self.failures.push(SerializationFailure {
                    id: entity.id.clone(),
                    name: entity.name.clone(),
                    kind: entity.kind,
                    source,
                });
                None
            }
        }
    }

    /// The persisted form of a tagged entity: everything when added, only
    /// what changed when modified.
    fn persisted(&mut self, entity: &Entity) -> Option<Map<String, Value>> {
        let serialized = self.serialize(entity)?;

        if entity.metadata.is_added() {
            Some(strip_bookkeeping(serialized))
        } else {
            Some(diff(self.graph, entity, serialized).into_fields())
        }
    }

    fn fragment<E: FragmentExtra>(&mut self, entity: &Entity, extra: E) -> Option<Fragment<E>> {
        entity.metadata.query_tag()?;
        let object = self.persisted(entity)?;

        Some(Fragment {
            id: entity.id.clone(),
            name: entity.name.clone(),
            kind: entity.kind,
            added: Some(entity.metadata.is_added()),
            serialization_object: Some(object),
            extra,
        })
    }

    fn plain(&mut self, entity: &Entity) -> Option<Fragment<NoExtra>> {
        self.fragment(entity, NoExtra::default())
    }

    fn node(&mut self, entity: &Entity) -> Option<Fragment<NodeExtra>> {
        if entity.metadata.placeholder_emitter || entity.metadata.editor_camera {
            return None;
        }

        let mut extra = NodeExtra::default();

        let serialization_object = match entity.metadata.query_tag() {
            Some(ChangeTag::Added) => {
                let object = self.persisted(entity)?;

                if entity.kind == EntityKind::Mesh {
                    extra.geometries.extend(self.owned(entity, "geometryId"));
                    extra.skeletons.extend(self.owned(entity, "skeletonId"));
                }

                Some(object)
            }
            Some(ChangeTag::Modified) => {
                let mut object = self.persisted(entity)?;

                if entity.kind == EntityKind::Mesh {
                    for field in MESH_DERIVED_FIELDS {
                        object.remove(field);
                    }

                    extra.skeletons.extend(self.modified_skeleton(entity));
                }

                Some(object)
            }
            None => None,
        };

        extra.animations = entity
            .animations
            .iter()
            .filter(|animation| animation.tags.is_added())
            .map(|animation| AnimationFragment {
                name: animation.name.clone(),
                target_id: entity.id.clone(),
                serialization_object: animation.data.clone(),
            })
            .collect();

        extra.physics = entity
            .physics
            .as_ref()
            .filter(|physics| physics.tags.is_added())
            .cloned();

        extra.actions = entity
            .handler
            .as_ref()
            .filter(|handler| handler.tags.is_added())
            .map(|handler| handler.actions.clone());

        if serialization_object.is_none() && extra.is_empty() {
            return None;
        }

        Some(Fragment {
            id: entity.id.clone(),
            name: entity.name.clone(),
            kind: entity.kind,
            added: Some(entity.metadata.is_added()),
            serialization_object,
            extra,
        })
    }

    /// The full form of an entity owned by an added mesh, such as its
    /// geometry or skeleton. One shared with the baseline is sent as a
    /// modification so importing it never replaces the baseline's copy.
    fn owned(&mut self, mesh: &Entity, field: &str) -> Option<Fragment> {
        let graph = self.graph;
        let owned = graph.get(mesh.link(field)?)?;
        let object = strip_bookkeeping(self.serialize(owned)?);

        Some(Fragment {
            id: owned.id.clone(),
            name: owned.name.clone(),
            kind: owned.kind,
            added: Some(owned.metadata.is_added()),
            serialization_object: Some(object),
            extra: NoExtra::default(),
        })
    }

    fn modified_skeleton(&mut self, mesh: &Entity) -> Option<Fragment> {
        let graph = self.graph;
        let skeleton = graph.get(mesh.link("skeletonId")?)?;

        if !skeleton.metadata.is_modified() {
            return None;
        }

        let mut object = self.persisted(skeleton)?;
        object.remove("bones");

        Some(Fragment {
            id: skeleton.id.clone(),
            name: skeleton.name.clone(),
            kind: skeleton.kind,
            added: Some(false),
            serialization_object: Some(object),
            extra: NoExtra::default(),
        })
    }

    fn material(&mut self, entity: &Entity) -> Option<Fragment<MaterialExtra>> {
        let bindings = material_bindings(self.graph, &entity.id);
        self.fragment(entity, MaterialExtra { bindings })
    }

    fn particle_system(&mut self, entity: &Entity) -> Option<Fragment<ParticleExtra>> {
        let graph = self.graph;
        let emitter = entity
            .link("emitterId")
            .and_then(|emitter_id| graph.get(emitter_id));

        let extra = ParticleExtra {
            has_emitter: emitter.map_or(false, |emitter| !emitter.metadata.placeholder_emitter),
            emitter_position: emitter.and_then(|emitter| vector3(emitter.get("position")?)),
        };

        self.fragment(entity, extra)
    }

    /// The global configuration, with the editor camera's current pose.
    fn global_configuration(&mut self) -> Value {
        let graph = self.graph;
        let mut global = graph.global.clone();

        if let Some(camera) = graph.editor_camera() {
            if let Some(serialized) = self.serialize(camera) {
                global.serialized_camera = Some(strip_bookkeeping(serialized));
            }
        }

        let value = global
            .validate()
            .map_err(GlobalExportFailure::from)
            .and_then(|()| serde_json::to_value(&global).map_err(GlobalExportFailure::from));

        match value {
            Ok(value) => value,
            Err(failure) => {
                log::trace!("Global configuration cannot be exported: {}", failure);

                self.global_failure = Some(failure);
                Value::Null
            }
        }
    }
}

/// Every mesh slot that uses the given material. A mesh with a single slot
/// yields one binding without a slot index.
fn material_bindings(graph: &SceneGraph, material_id: &str) -> Vec<MaterialBinding> {
    let mut bindings = Vec::new();

    for mesh in graph.iter().filter(|entity| entity.kind == EntityKind::Mesh) {
        let slots = match mesh.get("materialIds") {
            Some(Value::Array(slots)) => slots,
            _ => continue,
        };

        for (index, slot) in slots.iter().enumerate() {
            if slot.as_str() != Some(material_id) {
                continue;
            }

            bindings.push(MaterialBinding {
                mesh_id: mesh.id.clone(),
                slot: if slots.len() > 1 { Some(index) } else { None },
            });
        }
    }

    bindings
}

/// Every entry of the asset components extensions can use, tagged or not.
fn assets_extension(graph: &SceneGraph) -> Value {
    let mut usable = Map::new();

    for component in EXTENSION_ASSET_COMPONENTS {
        let entries = match graph.assets.get(component) {
            Some(entries) => entries,
            None => continue,
        };

        let records = entries
            .iter()
            .map(|entry| {
                let mut record = Map::new();
                record.insert("name".to_owned(), Value::String(entry.name.clone()));
                record.insert("data".to_owned(), entry.data.clone());
                Value::Object(record)
            })
            .collect();

        usable.insert(component.to_owned(), Value::Array(records));
    }

    Value::Object(usable)
}

fn files_list(graph: &SceneGraph) -> Vec<String> {
    graph
        .files
        .iter()
        .filter(|file| !file.do_not_export)
        .filter(|file| !is_project_file(&file.name))
        .filter(|file| graph.scene_file_name.as_deref() != Some(file.name.as_str()))
        .map(|file| format!("scene/{}", file.name))
        .collect()
}

fn is_project_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map_or(false, |ext| ext == PROJECT_EXTENSION)
}

fn vector3(value: &Value) -> Option<[f64; 3]> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use insta::assert_yaml_snapshot;
    use maplit::btreemap;
    use serde_json::json;

    use crate::scene::{
        load_scene, Animation, AssetEntry, InteractionHandler, PhysicsImpostor, SceneFile,
        SceneFileEntry,
    };

    fn baseline(entities: Value) -> SceneGraph {
        let file: SceneFile = serde_json::from_value(json!({ "entities": entities })).unwrap();
        load_scene(file, &CodecTable::standard()).unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn untagged_entities_are_left_out() {
        let _ = env_logger::try_init();

        let graph = baseline(json!([
            { "type": "Mesh", "id": "cube1", "castShadow": false },
            { "type": "Material", "id": "m1" },
            { "type": "Sound", "id": "s1" },
        ]));

        let assembled = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new());

        assert!(assembled.failures.is_empty());
        assert_eq!(assembled.document.fragment_count(), 0);
    }

    #[test]
    fn modified_and_added_nodes() {
        let _ = env_logger::try_init();

        let mut graph = baseline(json!([
            { "type": "Mesh", "id": "cube1", "name": "Cube", "castShadow": false },
        ]));
        graph.set_field("cube1", "castShadow", true);
        graph
            .add(Entity::new(EntityKind::Light, "L9").field("intensity", 2))
            .unwrap();

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_yaml_snapshot!(document.nodes, @r###"
        ---
        - id: cube1
          name: Cube
          type: Mesh
          added: false
          serializationObject:
            castShadow: true
            id: cube1
        - id: L9
          name: L9
          type: Light
          added: true
          serializationObject:
            id: L9
            intensity: 2
            name: L9
        "###);
    }

    #[test]
    fn added_mesh_carries_geometry_and_skeleton() {
        let mut graph = SceneGraph::new();
        graph
            .add(Entity::new(EntityKind::Geometry, "g1").field("indices", json!([0, 1, 2])))
            .unwrap();
        graph
            .add(Entity::new(EntityKind::Skeleton, "sk1").field("bones", json!([])))
            .unwrap();
        graph
            .add(
                Entity::new(EntityKind::Mesh, "hero")
                    .field("geometryId", "g1")
                    .field("skeletonId", "sk1"),
            )
            .unwrap();

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_eq!(document.nodes.len(), 1);
        let extra = &document.nodes[0].extra;
        assert_eq!(extra.geometries.len(), 1);
        assert_eq!(extra.geometries[0].id, "g1");
        assert_eq!(extra.skeletons[0].id, "sk1");
        assert_eq!(
            extra.geometries[0].serialization_object.as_ref().unwrap()["indices"],
            json!([0, 1, 2])
        );
    }

    #[test]
    fn modified_mesh_drops_derived_fields() {
        let mut graph = baseline(json!([
            { "type": "Skeleton", "id": "sk1", "bones": [1], "needInitialSkinMatrix": false },
            {
                "type": "Mesh",
                "id": "hero",
                "skeletonId": "sk1",
                "materialIds": ["m1"],
                "visibility": 1,
            },
        ]));

        graph.edit("hero", |mesh| {
            mesh.fields.insert("materialIds".to_owned(), json!(["m2"]));
            mesh.fields.insert("visibility".to_owned(), json!(0));
        });
        graph.edit("sk1", |skeleton| {
            skeleton.fields.insert("bones".to_owned(), json!([1, 2]));
            skeleton
                .fields
                .insert("needInitialSkinMatrix".to_owned(), json!(true));
        });

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_eq!(document.nodes.len(), 1);
        let hero = &document.nodes[0];
        assert_eq!(
            hero.serialization_object,
            Some(object(json!({ "id": "hero", "visibility": 0 })))
        );
        assert_eq!(
            hero.extra.skeletons[0].serialization_object,
            Some(object(json!({ "id": "sk1", "needInitialSkinMatrix": true })))
        );
        assert!(hero.extra.geometries.is_empty());
    }

    #[test]
    fn untagged_node_with_added_aux() {
        let mut graph = baseline(json!([{ "type": "Mesh", "id": "door" }]));

        let door = graph.get_mut("door").unwrap();
        door.animations.push(
            Animation::new("open", object(json!({ "frames": 30 }))).tagged(ChangeTag::Added),
        );
        door.physics = Some(PhysicsImpostor::new(1, 10.0, 0.5, 0.0).tagged(ChangeTag::Added));
        door.handler = Some(InteractionHandler::new(json!({ "onPick": "open" })));

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        let door = &document.nodes[0];
        assert_eq!(door.added, Some(false));
        assert_eq!(door.serialization_object, None);
        assert_eq!(door.extra.animations[0].target_id, "door");
        assert!(door.extra.physics.is_some());
        assert_eq!(door.extra.actions, None);
    }

    #[test]
    fn export_uses_stashed_handlers() {
        let mut graph = baseline(json!([{ "type": "Mesh", "id": "door" }]));
        graph.get_mut("door").unwrap().handler =
            Some(InteractionHandler::new(json!("editor")));

        // Put the scene's handler in the stash, leaving the editor's attached.
        let mut toggle = InteractionToggle::new();
        toggle.toggle(&mut graph);
        graph.get_mut("door").unwrap().handler =
            Some(InteractionHandler::new(json!("scene")).tagged(ChangeTag::Added));
        toggle.toggle(&mut graph);

        let document = export_project(
            &mut graph,
            &mut toggle,
            &CodecTable::standard(),
            &RemovedObjects::new(),
        )
        .into_document()
        .unwrap();

        assert_eq!(document.nodes[0].extra.actions, Some(json!("scene")));
        assert_eq!(
            graph.get("door").unwrap().handler.as_ref().unwrap().actions,
            json!("editor")
        );
    }

    #[test]
    fn placeholders_and_editor_camera_are_not_nodes() {
        let mut graph = SceneGraph::default_scene();
        graph.edit("editorCamera", |camera| {
            camera.fields.insert("fov".to_owned(), json!(1));
        });

        let mut emitter =
            Entity::new(EntityKind::Mesh, "emitter").field("position", json!([1, 2, 3]));
        emitter.metadata.placeholder_emitter = true;
        graph.add(emitter).unwrap();
        graph
            .add(Entity::new(EntityKind::ParticleSystem, "smoke").field("emitterId", "emitter"))
            .unwrap();

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert!(document.nodes.is_empty());
        assert_eq!(document.particle_systems.len(), 1);
        assert_eq!(
            document.particle_systems[0].extra,
            ParticleExtra {
                has_emitter: false,
                emitter_position: Some([1.0, 2.0, 3.0]),
            }
        );
        assert_eq!(
            document.global_configuration["serializedCamera"]["fov"],
            json!(1)
        );
    }

    #[test]
    fn material_bindings_per_slot() {
        let mut graph = baseline(json!([
            { "type": "Material", "id": "m1", "alpha": 1 },
            { "type": "Mesh", "id": "a", "materialIds": ["m1"] },
            { "type": "Mesh", "id": "b", "materialIds": ["m2", "m1"] },
        ]));
        graph.set_field("m1", "alpha", 0.5);

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_eq!(document.materials.len(), 1);
        assert_eq!(
            document.materials[0].extra.bindings,
            vec![
                MaterialBinding {
                    mesh_id: "a".to_owned(),
                    slot: None,
                },
                MaterialBinding {
                    mesh_id: "b".to_owned(),
                    slot: Some(1),
                },
            ]
        );
    }

    #[test]
    fn failures_are_collected() {
        fn failing(_: &SceneGraph, _: &Entity) -> Result<Map<String, Value>, CodecError> {
            Err(CodecError::Engine("device lost".to_owned()))
        }

        let codecs = CodecTable::standard().with(
            EntityKind::Sound,
            crate::codec::Codec {
                serialize: failing,
                ..crate::codec::Codec::generic()
            },
        );

        let mut graph = SceneGraph::new();
        graph.add(Entity::new(EntityKind::Sound, "s1").name("Wind")).unwrap();
        graph.add(Entity::new(EntityKind::Light, "L9")).unwrap();

        let assembled = assemble(&graph, &codecs, &RemovedObjects::new());
        assert_eq!(assembled.document.nodes.len(), 1);
        assert_eq!(assembled.failures.len(), 1);
        assert_eq!(
            assembled.failures[0].to_string(),
            "could not serialize Sound 'Wind' (s1)"
        );

        assert!(matches!(
            assembled.into_document(),
            Err(ExportError::Serialization { .. })
        ));
    }

    #[test]
    fn invalid_global_configuration_fails_the_export() {
        let mut graph = SceneGraph::new();
        graph.global.clear_color[0] = f64::NAN;

        let assembled = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new());

        assert!(assembled.failures.is_empty());
        assert_eq!(assembled.document.global_configuration, Value::Null);
        assert!(matches!(
            assembled.global_failure,
            Some(GlobalExportFailure::Invalid(
                GlobalConfigurationError::NonFiniteColor
            ))
        ));
        assert!(matches!(
            assembled.into_document(),
            Err(ExportError::GlobalConfiguration { .. })
        ));
    }

    #[test]
    fn assets_files_and_metadata() {
        let mut graph = SceneGraph::new();
        graph.assets.insert(
            "prefabs".to_owned(),
            vec![AssetEntry::new("tree", json!({ "lod": 2 })), {
                let mut entry = AssetEntry::new("rock", json!({}));
                entry.tags.tag(ChangeTag::Added);
                entry
            }],
        );
        graph.assets.insert(
            "scripts".to_owned(),
            vec![AssetEntry::new("main.js", json!(null))],
        );
        graph.files = vec![
            SceneFileEntry {
                name: "brick.png".to_owned(),
                do_not_export: false,
            },
            SceneFileEntry {
                name: "cache.bin".to_owned(),
                do_not_export: true,
            },
            SceneFileEntry {
                name: "level.editorproject".to_owned(),
                do_not_export: false,
            },
            SceneFileEntry {
                name: "level.scene".to_owned(),
                do_not_export: false,
            },
        ];
        graph.scene_file_name = Some("level.scene".to_owned());
        graph
            .custom_metadata
            .insert("notes".to_owned(), json!("hello"));

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_eq!(
            document.assets,
            btreemap! {
                "prefabs".to_owned() => vec![AssetFragment {
                    name: "rock".to_owned(),
                    data: json!({}),
                    added: true,
                }],
            }
        );
        assert_eq!(document.files_list, vec!["scene/brick.png".to_owned()]);
        assert_eq!(document.custom_metadatas["notes"], json!("hello"));
    }

    #[test]
    fn usable_assets_are_mirrored_for_extensions() {
        let mut graph = SceneGraph::new();
        graph.assets.insert(
            "prefabs".to_owned(),
            vec![AssetEntry::new("tree", json!({ "lod": 2 })), {
                let mut entry = AssetEntry::new("rock", json!({}));
                entry.tags.tag(ChangeTag::Added);
                entry
            }],
        );
        graph.assets.insert(
            "scripts".to_owned(),
            vec![AssetEntry::new("main.js", json!(null))],
        );

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_yaml_snapshot!(document.custom_metadatas, @r###"
        ---
        AssetsExtension:
          prefabs:
            - data:
                lod: 2
              name: tree
            - data: {}
              name: rock
        "###);
    }

    #[test]
    fn assets_extension_is_written_without_usable_assets() {
        let graph = SceneGraph::new();

        let document = assemble(&graph, &CodecTable::standard(), &RemovedObjects::new())
            .into_document()
            .unwrap();

        assert_eq!(document.custom_metadatas[ASSETS_EXTENSION_KEY], json!({}));
    }
}
