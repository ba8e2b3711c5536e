//! Applies a project document onto a freshly loaded baseline scene.
//!
//! Fragments are applied category by category. A reference to an entity that
//! has not been created yet is stripped from its fragment and recorded as a
//! waiting reference; once every fragment has been applied, waiting
//! references are resolved or dropped.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    codec::{CodecError, CodecTable},
    error::ErrorDisplay,
    multimap::MultiMap,
    project::{
        Fragment, FragmentExtra, MaterialBinding, NodeExtra, ParticleExtra, ProjectDocument,
        ASSETS_EXTENSION_KEY,
    },
    removed::RemovedObjects,
    scene::{
        Animation, AssetEntry, ChangeTag, Entity, EntityKind, EntityMetadata, FieldKind,
        GlobalConfiguration, GlobalConfigurationError, GraphError, InteractionHandler,
        SceneFileEntry, SceneGraph,
    },
    store::StoreError,
};

/// A reference field whose target did not exist yet when its fragment was
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WaitingReference {
    pub source_id: String,
    pub field: String,
    pub target_id: String,
}

/// Why a single fragment could not be applied.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("the fragment describes a {found} but the existing entity is a {expected}")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Error)]
#[error("could not apply {category} fragment '{name}' ({id})")]
pub struct ParseFailure {
    pub category: &'static str,
    pub id: String,
    pub name: String,
    pub source: FragmentError,
}

#[derive(Debug, Error)]
pub enum GlobalConfigurationFailure {
    #[error("the global configuration is malformed")]
    Malformed { source: serde_json::Error },

    #[error(transparent)]
    Invalid(#[from] GlobalConfigurationError),

    #[error("the editor camera could not be restored")]
    Camera { source: CodecError },
}

/// Errors that abort an import as a whole.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not apply the global configuration")]
    GlobalConfiguration { source: GlobalConfigurationFailure },

    #[error(transparent)]
    Store {
        #[from]
        source: StoreError,
    },
}

/// The outcome of an import that ran to completion.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Fragments that could not be applied. Every other fragment was.
    pub errors: Vec<ParseFailure>,

    /// References whose target never appeared. They were dropped.
    pub unresolved: Vec<WaitingReference>,

    /// How many fragments were applied.
    pub applied: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// All fragment errors as one message, one error per line.
    pub fn combined_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let lines: Vec<String> = self
            .errors
            .iter()
            .map(|failure| ErrorDisplay(failure).to_string())
            .collect();

        Some(lines.join("\n"))
    }
}

/// Applies a project document to the graph.
///
/// A malformed global configuration aborts the import before anything else
/// is touched. Any other failure is confined to its fragment and reported.
pub fn reconcile(
    graph: &mut SceneGraph,
    codecs: &CodecTable,
    removed: &mut RemovedObjects,
    document: &ProjectDocument,
) -> Result<ImportReport, ImportError> {
    apply_global_configuration(graph, codecs, &document.global_configuration)
        .map_err(|source| ImportError::GlobalConfiguration { source })?;

    removed.restore(&document.removed_objects);
    removed.enforce(graph);

    let mut context = ReconcileContext {
        codecs,
        removed,
        report: ImportReport::default(),
        waiting: MultiMap::new(),
    };

    for fragment in &document.textures {
        context.apply_fragment(graph, "textures", fragment);
    }

    for fragment in &document.nodes {
        context.apply_node(graph, fragment);
    }

    for fragment in &document.materials {
        if context.apply_fragment(graph, "materials", fragment).is_some() {
            bind_material(graph, &fragment.id, &fragment.extra.bindings);
        }
    }

    for fragment in &document.particle_systems {
        if !fragment.extra.has_emitter {
            ensure_placeholder_emitter(graph, fragment);
        }

        context.apply_fragment(graph, "particleSystems", fragment);
    }

    for fragment in &document.shadow_generators {
        context.apply_fragment(graph, "shadowGenerators", fragment);
    }

    for fragment in &document.sounds {
        context.apply_fragment(graph, "sounds", fragment);
    }

    for fragment in &document.render_targets {
        context.apply_fragment(graph, "renderTargets", fragment);
    }

    for fragment in &document.effect_layers {
        context.apply_fragment(graph, "effectLayers", fragment);
    }

    for fragment in &document.gui {
        context.apply_fragment(graph, "gui", fragment);
    }

    apply_assets(graph, document);

    for (key, value) in &document.custom_metadatas {
        // Rebuilt from the assets on every export.
        if key == ASSETS_EXTENSION_KEY {
            continue;
        }

        graph.custom_metadata.insert(key.clone(), value.clone());
    }

    register_files(graph, &document.files_list);

    context.resolve_waiting(graph);
    let report = context.report;

    removed.enforce(graph);

    log::debug!(
        "Applied {} fragments with {} errors and {} unresolved references",
        report.applied,
        report.errors.len(),
        report.unresolved.len()
    );

    Ok(report)
}

struct ReconcileContext<'a> {
    codecs: &'a CodecTable,
    removed: &'a RemovedObjects,
    report: ImportReport,

    /// Waiting references keyed by the id they wait on.
    waiting: MultiMap<String, (String, String)>,
}

impl ReconcileContext<'_> {
    /// Applies one fragment, returning the id of the entity it created or
    /// updated.
    fn apply_fragment<E: FragmentExtra>(
        &mut self,
        graph: &mut SceneGraph,
        category: &'static str,
        fragment: &Fragment<E>,
    ) -> Option<String> {
        if self.removed.is_tombstoned(&fragment.id) {
            log::debug!("Skipping {} '{}': it was deleted", fragment.kind, fragment.id);
            return None;
        }

        let object = match &fragment.serialization_object {
            Some(object) => object,
            None => return touch_existing(graph, fragment),
        };

        let mut object = object.clone();
        object
            .entry("id")
            .or_insert_with(|| Value::String(fragment.id.clone()));

        if fragment.added == Some(true) {
            // The id was deleted from the baseline and then reused.
            if let Some(stale) = graph.remove(&fragment.id) {
                log::debug!(
                    "Replacing baseline {} '{}' with a new {}",
                    stale.kind,
                    fragment.id,
                    fragment.kind
                );
            }
        }

        let deferred = defer_unresolved(graph, fragment.kind, &mut object);

        let result = if let Some(existing) = graph.get_mut(&fragment.id) {
            if existing.kind != fragment.kind {
                Err(FragmentError::KindMismatch {
                    expected: existing.kind,
                    found: fragment.kind,
                })
            } else {
                self.codecs
                    .parse_into(existing, &object)
                    .map(|()| existing.metadata.tag(ChangeTag::Modified))
                    .map_err(FragmentError::from)
            }
        } else if fragment.added == Some(false) {
            log::debug!(
                "Skipping {} '{}': it no longer exists in the baseline",
                fragment.kind,
                fragment.id
            );
            return None;
        } else {
            self.codecs
                .parse(fragment.kind, &object)
                .map_err(FragmentError::from)
                .and_then(|mut entity| {
                    entity.metadata.tag(ChangeTag::Added);
                    graph.insert(entity).map_err(FragmentError::from)
                })
        };

        match result {
            Ok(()) => {
                log::trace!("Applied {} fragment {}", category, fragment.id);

                for (field, target) in deferred {
                    self.waiting.insert(target, (fragment.id.clone(), field));
                }

                self.report.applied += 1;
                Some(fragment.id.clone())
            }
            Err(source) => {
                self.report.errors.push(ParseFailure {
                    category,
                    id: fragment.id.clone(),
                    name: fragment.name.clone(),
                    source,
                });
                None
            }
        }
    }

    fn apply_node(&mut self, graph: &mut SceneGraph, fragment: &Fragment<NodeExtra>) {
        for geometry in &fragment.extra.geometries {
            self.apply_fragment(graph, "geometries", geometry);
        }

        for skeleton in &fragment.extra.skeletons {
            self.apply_fragment(graph, "skeletons", skeleton);
        }

        if let Some(id) = self.apply_fragment(graph, "nodes", fragment) {
            apply_node_extra(graph, &id, &fragment.extra);
        }
    }

    fn resolve_waiting(&mut self, graph: &mut SceneGraph) {
        let waiting = std::mem::take(&mut self.waiting);

        for (target_id, sources) in waiting {
            let target_exists = graph.contains(&target_id);

            for (source_id, field) in sources {
                if !target_exists {
                    log::warn!(
                        "Dropping reference {}.{}: no entity with id {} exists",
                        source_id,
                        field,
                        target_id
                    );

                    self.report.unresolved.push(WaitingReference {
                        source_id,
                        field,
                        target_id: target_id.clone(),
                    });
                    continue;
                }

                match graph.get_mut(&source_id) {
                    Some(source) => {
                        log::trace!("Resolved {}.{} -> {}", source_id, field, target_id);
                        source.fields.insert(field, Value::String(target_id.clone()));
                    }
                    None => {
                        log::debug!("Entity {} went away before {} resolved", source_id, field)
                    }
                }
            }
        }

        self.report.unresolved.sort();
    }
}

/// A fragment without a serialized object only carries auxiliary data for an
/// entity that must already exist.
fn touch_existing<E: FragmentExtra>(
    graph: &mut SceneGraph,
    fragment: &Fragment<E>,
) -> Option<String> {
    match graph.get_mut(&fragment.id) {
        Some(entity) => {
            entity.metadata.tag(ChangeTag::Modified);
            Some(fragment.id.clone())
        }
        None => {
            log::debug!("Skipping auxiliary data for missing entity {}", fragment.id);
            None
        }
    }
}

/// Strips every reference field whose target is not in the graph yet,
/// returning the stripped `(field, target)` pairs.
fn defer_unresolved(
    graph: &SceneGraph,
    kind: EntityKind,
    object: &mut Map<String, Value>,
) -> Vec<(String, String)> {
    let mut deferred = Vec::new();

    for (field, field_kind) in kind.reference_fields() {
        let target = match (field_kind, object.get(field)) {
            (_, Some(Value::String(target))) => target.clone(),
            (FieldKind::EntityRef, Some(Value::Object(reference))) => {
                match reference.get("id").and_then(Value::as_str) {
                    Some(target) => target.to_owned(),
                    None => continue,
                }
            }
            _ => continue,
        };

        if !graph.contains(&target) {
            object.remove(field);
            deferred.push((field.to_owned(), target));
        }
    }

    deferred
}

fn apply_node_extra(graph: &mut SceneGraph, id: &str, extra: &NodeExtra) {
    for fragment in &extra.animations {
        let target = if graph.contains(&fragment.target_id) {
            fragment.target_id.as_str()
        } else {
            id
        };

        if let Some(entity) = graph.get_mut(target) {
            let animation = Animation::new(&fragment.name, fragment.serialization_object.clone())
                .tagged(ChangeTag::Added);

            match entity
                .animations
                .iter_mut()
                .find(|existing| existing.name == animation.name)
            {
                Some(existing) => *existing = animation,
                None => entity.animations.push(animation),
            }
        }
    }

    let entity = match graph.get_mut(id) {
        Some(entity) => entity,
        None => return,
    };

    if let Some(physics) = &extra.physics {
        entity.physics = Some(physics.clone().tagged(ChangeTag::Added));
    }

    if let Some(actions) = &extra.actions {
        entity.handler = Some(InteractionHandler::new(actions.clone()).tagged(ChangeTag::Added));
    }
}

fn bind_material(graph: &mut SceneGraph, material_id: &str, bindings: &[MaterialBinding]) {
    for binding in bindings {
        let mesh = match graph.get_mut(&binding.mesh_id) {
            Some(mesh) if mesh.kind == EntityKind::Mesh => mesh,
            _ => {
                log::warn!(
                    "Material {} is bound to mesh {}, which does not exist",
                    material_id,
                    binding.mesh_id
                );
                continue;
            }
        };

        let material = Value::String(material_id.to_owned());
        let slots = mesh
            .fields
            .entry("materialIds")
            .or_insert_with(|| Value::Array(Vec::new()));

        if !slots.is_array() {
            *slots = Value::Array(Vec::new());
        }

        if let Value::Array(slots) = slots {
            match binding.slot {
                Some(index) => {
                    if slots.len() <= index {
                        slots.resize(index + 1, Value::Null);
                    }
                    slots[index] = material;
                }
                None => *slots = vec![material],
            }
        }
    }
}

/// Particle systems whose emitter was only a position get an empty mesh at
/// that position to emit from.
fn ensure_placeholder_emitter(graph: &mut SceneGraph, fragment: &Fragment<ParticleExtra>) {
    let emitter_id = match fragment
        .serialization_object
        .as_ref()
        .and_then(|object| object.get("emitterId"))
        .and_then(Value::as_str)
    {
        Some(emitter_id) => emitter_id,
        None => return,
    };

    if graph.contains(emitter_id) {
        return;
    }

    let mut emitter = Entity::new(EntityKind::Mesh, emitter_id)
        .metadata(EntityMetadata::new().placeholder_emitter(true));

    if let Some(position) = fragment.extra.emitter_position {
        emitter = emitter.field("position", position.to_vec());
    }

    log::trace!("Created placeholder emitter {}", emitter_id);

    if let Err(err) = graph.insert(emitter) {
        log::warn!("Could not create placeholder emitter: {}", err);
    }
}

fn apply_global_configuration(
    graph: &mut SceneGraph,
    codecs: &CodecTable,
    value: &Value,
) -> Result<(), GlobalConfigurationFailure> {
    if value.is_null() {
        return Ok(());
    }

    let mut global: GlobalConfiguration = serde_json::from_value(value.clone())
        .map_err(|source| GlobalConfigurationFailure::Malformed { source })?;
    global.validate()?;

    if let Some(mut camera) = global.serialized_camera.take() {
        let editor_camera_id = graph.editor_camera().map(|camera| camera.id.clone());

        match editor_camera_id {
            Some(id) => {
                camera.remove("id");

                if let Some(entity) = graph.get_mut(&id) {
                    codecs
                        .parse_into(entity, &camera)
                        .map_err(|source| GlobalConfigurationFailure::Camera { source })?;
                }
            }
            None => {
                camera
                    .entry("id")
                    .or_insert_with(|| Value::String("editorCamera".to_owned()));

                let mut entity = codecs
                    .parse(EntityKind::Camera, &camera)
                    .map_err(|source| GlobalConfigurationFailure::Camera { source })?;
                entity.metadata.editor_camera = true;

                graph.insert(entity).map_err(|err| GlobalConfigurationFailure::Camera {
                    source: CodecError::Engine(err.to_string()),
                })?;
            }
        }
    }

    graph.global = global;

    Ok(())
}

fn apply_assets(graph: &mut SceneGraph, document: &ProjectDocument) {
    for (component, fragments) in &document.assets {
        let entries = graph.assets.entry(component.clone()).or_default();

        for fragment in fragments {
            let tag = if fragment.added {
                ChangeTag::Added
            } else {
                ChangeTag::Modified
            };

            match entries.iter_mut().find(|entry| entry.name == fragment.name) {
                Some(entry) => {
                    entry.data = fragment.data.clone();
                    entry.tags.tag(tag);
                }
                None if fragment.added => {
                    let mut entry = AssetEntry::new(&fragment.name, fragment.data.clone());
                    entry.tags.tag(tag);
                    entries.push(entry);
                }
                None => log::debug!(
                    "Skipping asset {} of {}: it no longer exists",
                    fragment.name,
                    component
                ),
            }
        }
    }
}

fn register_files(graph: &mut SceneGraph, files_list: &[String]) {
    for path in files_list {
        let name = path.strip_prefix("scene/").unwrap_or(path);

        if !graph.files.iter().any(|file| file.name == name) {
            graph.files.push(SceneFileEntry {
                name: name.to_owned(),
                do_not_export: false,
            });
        }
    }
}
